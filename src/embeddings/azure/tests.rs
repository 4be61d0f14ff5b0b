use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, Request, ResponseTemplate,
    matchers::{header, method, path},
};

use super::*;

fn config_for(endpoint: &str) -> AzureConfig {
    AzureConfig {
        endpoint: Some(endpoint.to_string()),
        api_key: Some("test-key".to_string()),
        embedding_deployment: Some("embed-test".to_string()),
        ..AzureConfig::default()
    }
}

/// Answers every input with `[len, first byte, 1.0]`, listed in reverse index order
fn echo_embeddings(request: &Request) -> ResponseTemplate {
    let body: Value = serde_json::from_slice(&request.body).expect("request body should be JSON");
    let inputs = body["input"].as_array().cloned().unwrap_or_default();

    let mut data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            let text = input.as_str().unwrap_or_default();
            let first = text.bytes().next().map_or(0.0, f32::from);
            json!({
                "object": "embedding",
                "index": index,
                "embedding": [text.len() as f32, first, 1.0],
            })
        })
        .collect();
    data.reverse();

    ResponseTemplate::new(200).set_body_json(json!({ "object": "list", "data": data }))
}

#[test]
fn client_configuration() {
    let embeddings =
        AzureEmbeddings::new(&config_for("https://example.openai.azure.com")).expect("client");
    assert_eq!(embeddings.deployment(), "embed-test");
    assert_eq!(
        embeddings.url.path(),
        "/openai/deployments/embed-test/embeddings"
    );
}

#[test]
fn missing_deployment_is_rejected() {
    let config = AzureConfig {
        embedding_deployment: None,
        ..config_for("https://example.openai.azure.com")
    };
    assert!(AzureEmbeddings::new(&config).is_err());
}

#[test]
fn empty_input_makes_no_request() {
    // Port 9 is discard; any request would fail
    let embeddings = AzureEmbeddings::new(&config_for("http://127.0.0.1:9")).expect("client");
    let vectors = embeddings.embed_documents(&[]).expect("empty input");
    assert!(vectors.is_empty());
}

#[tokio::test]
async fn documents_are_embedded_in_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/deployments/embed-test/embeddings"))
        .and(header("api-key", "test-key"))
        .respond_with(echo_embeddings)
        .expect(1)
        .mount(&server)
        .await;

    let embeddings = AzureEmbeddings::new(&config_for(&server.uri())).expect("client");
    let texts: Vec<String> = ["a", "bb", "ccc", "dddd", "eeeee"]
        .iter()
        .map(ToString::to_string)
        .collect();

    let vectors = embeddings.embed_documents(&texts).expect("embedding");
    assert_eq!(vectors.len(), 5);
    for (text, vector) in texts.iter().zip(&vectors) {
        assert_eq!(vector[0], text.len() as f32);
        assert_eq!(vector[1], f32::from(text.as_bytes()[0]));
    }
}

#[tokio::test]
async fn query_embedding_matches_document_embedding() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(echo_embeddings)
        .mount(&server)
        .await;

    let embeddings = AzureEmbeddings::new(&config_for(&server.uri())).expect("client");
    let query = embeddings
        .embed_query("What color is the sky?")
        .expect("query");
    let documents = embeddings
        .embed_documents(&["What color is the sky?".to_string()])
        .expect("documents");

    assert_eq!(vec![query], documents);
}

#[tokio::test]
async fn count_mismatch_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "index": 0, "embedding": [0.1, 0.2] }]
        })))
        .mount(&server)
        .await;

    let embeddings = AzureEmbeddings::new(&config_for(&server.uri())).expect("client");
    let result = embeddings.embed_documents(&["one".to_string(), "two".to_string()]);
    assert!(result.is_err());
}

#[tokio::test]
async fn health_check_reports_unreachable_deployment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "DeploymentNotFound", "message": "The API deployment for this resource does not exist." }
        })))
        .mount(&server)
        .await;

    let embeddings = AzureEmbeddings::new(&config_for(&server.uri())).expect("client");
    let error = embeddings.health_check().expect_err("404 should fail");
    assert!(format!("{:#}", error).contains("DeploymentNotFound"));
}
