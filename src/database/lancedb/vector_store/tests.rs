use super::*;
use tempfile::TempDir;

const COLLECTION: &str = "test_collection";

fn create_test_record(index: u32, vector: Vec<f32>) -> EmbeddingRecord {
    EmbeddingRecord {
        id: format!("record_{}", index),
        vector,
        content: format!("This is test content for chunk {}", index),
        metadata: RecordMetadata {
            source: "Data/test.txt".to_string(),
            page: (index % 2 == 0).then_some(index),
            start_index: index * 10,
            chunk_index: index,
            ingested_at: "2024-01-01T00:00:00Z".to_string(),
        },
    }
}

fn axis_records() -> Vec<EmbeddingRecord> {
    vec![
        create_test_record(0, vec![1.0, 0.0, 0.0]),
        create_test_record(1, vec![0.0, 1.0, 0.0]),
        create_test_record(2, vec![0.0, 0.0, 1.0]),
        create_test_record(3, vec![0.9, 0.1, 0.0]),
    ]
}

#[tokio::test]
async fn create_and_count() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::create(temp_dir.path(), COLLECTION, 3)
        .await
        .expect("store should be created");

    assert_eq!(store.collection(), COLLECTION);
    assert_eq!(store.vector_dimension(), 3);
    assert_eq!(store.count_records().await.expect("count"), 0);

    store
        .add_records(&axis_records())
        .await
        .expect("records should be stored");
    assert_eq!(store.count_records().await.expect("count"), 4);
}

#[tokio::test]
async fn empty_batch_handling() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::create(temp_dir.path(), COLLECTION, 3)
        .await
        .expect("store should be created");

    store.add_records(&[]).await.expect("empty batch is a no-op");
    assert_eq!(store.count_records().await.expect("count"), 0);
}

#[tokio::test]
async fn dimension_mismatch_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::create(temp_dir.path(), COLLECTION, 3)
        .await
        .expect("store should be created");

    let result = store
        .add_records(&[create_test_record(0, vec![1.0, 0.0])])
        .await;
    assert!(matches!(result, Err(RagError::Database(_))));

    let result = store.search_similar(&[1.0, 0.0], 4).await;
    assert!(matches!(result, Err(RagError::Database(_))));
}

#[tokio::test]
async fn zero_dimension_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let result = VectorStore::create(temp_dir.path(), COLLECTION, 0).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn search_returns_nearest_first() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::create(temp_dir.path(), COLLECTION, 3)
        .await
        .expect("store should be created");
    store
        .add_records(&axis_records())
        .await
        .expect("records should be stored");

    let results = store
        .search_similar(&[1.0, 0.0, 0.0], 2)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].metadata.chunk_index, 0);
    assert_eq!(results[1].metadata.chunk_index, 3);
    assert!(results[0].distance <= results[1].distance);
    assert_eq!(results[0].content, "This is test content for chunk 0");
}

#[tokio::test]
async fn search_round_trips_metadata() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::create(temp_dir.path(), COLLECTION, 3)
        .await
        .expect("store should be created");
    let records = axis_records();
    store.add_records(&records).await.expect("records stored");

    let results = store
        .search_similar(&[0.0, 1.0, 0.0], 1)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].metadata, records[1].metadata);
    assert_eq!(results[0].metadata.page, None);
}

#[tokio::test]
async fn limit_larger_than_collection() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::create(temp_dir.path(), COLLECTION, 3)
        .await
        .expect("store should be created");
    store
        .add_records(&axis_records()[..2])
        .await
        .expect("records stored");

    let results = store
        .search_similar(&[1.0, 0.0, 0.0], 4)
        .await
        .expect("search should succeed");
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn open_existing_collection() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    {
        let store = VectorStore::create(temp_dir.path(), COLLECTION, 3)
            .await
            .expect("store should be created");
        store
            .add_records(&axis_records())
            .await
            .expect("records stored");
    }

    let store = VectorStore::open(temp_dir.path(), COLLECTION)
        .await
        .expect("store should open");
    assert_eq!(store.vector_dimension(), 3);
    assert_eq!(store.count_records().await.expect("count"), 4);
}

#[tokio::test]
async fn open_missing_or_empty_directory_is_store_not_found() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let missing = temp_dir.path().join("missing");
    let result = VectorStore::open(&missing, COLLECTION).await;
    assert!(matches!(result, Err(RagError::StoreNotFound(path)) if path == missing));

    let result = VectorStore::open(temp_dir.path(), COLLECTION).await;
    assert!(matches!(result, Err(RagError::StoreNotFound(_))));
}

#[tokio::test]
async fn open_unknown_collection_is_store_not_found() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    VectorStore::create(temp_dir.path(), COLLECTION, 3)
        .await
        .expect("store should be created");

    let result = VectorStore::open(temp_dir.path(), "other_collection").await;
    assert!(matches!(result, Err(RagError::StoreNotFound(_))));
}

#[tokio::test]
async fn create_replaces_existing_table() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::create(temp_dir.path(), COLLECTION, 3)
        .await
        .expect("store should be created");
    store
        .add_records(&axis_records())
        .await
        .expect("records stored");

    let store = VectorStore::create(temp_dir.path(), COLLECTION, 2)
        .await
        .expect("store should be recreated");
    assert_eq!(store.vector_dimension(), 2);
    assert_eq!(store.count_records().await.expect("count"), 0);
}

#[test]
fn reset_directory_clears_contents() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let persist_dir = temp_dir.path().join("store");
    fs::create_dir_all(persist_dir.join("nested")).expect("create nested");
    fs::write(persist_dir.join("nested/stale.lance"), b"old").expect("write stale file");

    VectorStore::reset_directory(&persist_dir).expect("reset should succeed");

    assert!(persist_dir.is_dir());
    assert_eq!(
        fs::read_dir(&persist_dir).expect("read dir").count(),
        0,
        "reset directory should be empty"
    );
}

#[test]
fn reset_directory_creates_missing_directory() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let persist_dir = temp_dir.path().join("a/b/store");

    VectorStore::reset_directory(&persist_dir).expect("reset should succeed");
    assert!(persist_dir.is_dir());
}
