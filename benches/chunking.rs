use criterion::{Criterion, criterion_group, criterion_main};
use doc_rag::embeddings::chunking::{ChunkingConfig, chunk_documents, split_text};
use doc_rag::loader::{Document, DocumentMetadata};
use std::hint::black_box;

fn sample_text() -> String {
    (0..400)
        .map(|i| {
            format!(
                "Section {}. The quarterly report covers revenue, staffing and regional growth. \
                 Figures for region {} were revised after the audit.\n",
                i,
                i % 12
            )
        })
        .collect::<Vec<_>>()
        .chunks(8)
        .map(|paragraph| paragraph.concat())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let text = sample_text();
    let config = ChunkingConfig::default();
    c.bench_function("split_text", |b| {
        b.iter(|| split_text(black_box(&text), black_box(&config)))
    });

    let documents: Vec<Document> = (0..20)
        .map(|page| Document {
            text: text.clone(),
            metadata: DocumentMetadata {
                source: "benches/report.pdf".to_string(),
                page: Some(page),
            },
        })
        .collect();
    c.bench_function("chunk_documents", |b| {
        b.iter(|| chunk_documents(black_box(&documents), black_box(&config)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
