/// Benchmarks for chunking and sync passes
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use knowledge_sync::chunker::TextChunker;
use knowledge_sync::config::Config;
use knowledge_sync::embedding::EmbeddingProvider;
use knowledge_sync::sync::{SyncClients, SyncEngine};
use knowledge_sync::types::SyncMode;
use knowledge_sync::vector_db::MemoryVectorIndex;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

/// Constant-vector embedder so the benchmark measures the pipeline, not a model
struct FlatEmbedder;

impl EmbeddingProvider for FlatEmbedder {
    fn embed_batch(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| vec![t.len() as f32; 8]).collect())
    }

    fn model_name(&self) -> &str {
        "flat"
    }
}

/// A document of `sections` headed sections with a few paragraphs each
fn generate_document(sections: usize) -> String {
    let mut doc = String::new();
    for s in 0..sections {
        doc.push_str(&format!("## Section {}\n\n", s));
        for p in 0..3 {
            doc.push_str(&format!(
                "Paragraph {p} of section {s}. Regular sleep, daily movement and short \
                 breaks lower stress. Keep a routine for at least two weeks before \
                 judging whether it helps. Note what changed and when.\n\n"
            ));
        }
    }
    doc
}

/// Helper to create a corpus spread over a few categories
fn create_corpus(dir: &TempDir, count: usize) -> anyhow::Result<()> {
    for i in 0..count {
        let category = ["faq", "guides", "articles"][i % 3];
        let category_dir = dir.path().join(category);
        std::fs::create_dir_all(&category_dir)?;
        std::fs::write(
            category_dir.join(format!("doc_{}.md", i)),
            generate_document(4),
        )?;
    }
    Ok(())
}

fn engine_for(corpus: &TempDir, state: &TempDir) -> SyncEngine {
    let mut config = Config::default();
    config.corpus.root = corpus.path().to_path_buf();
    config.sync.state_path = state.path().join("sync_state.json");
    SyncEngine::new(config).unwrap()
}

fn clients() -> SyncClients {
    SyncClients {
        embedder: Arc::new(FlatEmbedder),
        index: Arc::new(MemoryVectorIndex::new()),
    }
}

fn benchmark_chunking(c: &mut Criterion) {
    let chunker = TextChunker::new(1000, 200).unwrap();
    let mut group = c.benchmark_group("chunking");

    for sections in [10, 100, 1000].iter() {
        let doc = generate_document(*sections);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_sections", sections)),
            &doc,
            |b, doc| b.iter(|| chunker.chunk(black_box(doc))),
        );
    }

    group.finish();
}

fn benchmark_initial_sync(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("initial_sync");

    for file_count in [10, 50, 100].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_files", file_count)),
            file_count,
            |b, &count| {
                b.iter(|| {
                    rt.block_on(async {
                        let corpus = TempDir::new().unwrap();
                        let state = TempDir::new().unwrap();
                        create_corpus(&corpus, count).unwrap();

                        let engine = engine_for(&corpus, &state);
                        engine
                            .sync(
                                &clients(),
                                black_box(SyncMode::Incremental),
                                CancellationToken::new(),
                            )
                            .await
                            .unwrap()
                    })
                });
            },
        );
    }

    group.finish();
}

fn benchmark_unchanged_sync(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("unchanged_sync");

    for file_count in [10, 100].iter() {
        let corpus = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        create_corpus(&corpus, *file_count).unwrap();
        let engine = engine_for(&corpus, &state);
        let clients = clients();
        rt.block_on(engine.sync(&clients, SyncMode::Incremental, CancellationToken::new()))
            .unwrap();

        // Scan, hash and diff only; nothing is applied
        group.bench_function(
            BenchmarkId::from_parameter(format!("{}_files", file_count)),
            |b| {
                b.iter(|| {
                    rt.block_on(engine.sync(
                        &clients,
                        SyncMode::Incremental,
                        CancellationToken::new(),
                    ))
                    .unwrap()
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_chunking,
    benchmark_initial_sync,
    benchmark_unchanged_sync
);
criterion_main!(benches);
