use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use docqa_core::error::{Error, Result};
use docqa_core::traits::EmbeddingProvider;
use docqa_embed::HashingProvider;
use docqa_index::{IndexConfig, IndexManager, IndexManifest};

/// Wraps a provider and counts embed() calls, to observe the reuse path.
#[derive(Debug)]
struct CountingProvider {
    inner: HashingProvider,
    calls: AtomicUsize,
}

impl CountingProvider {
    fn new(dim: usize) -> Self {
        Self { inner: HashingProvider::new(dim), calls: AtomicUsize::new(0) }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for CountingProvider {
    fn provider_id(&self) -> &str {
        self.inner.provider_id()
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(texts).await
    }
}

fn tokens(n: usize) -> String {
    (0..n).map(|i| format!("tok{i}")).collect::<Vec<_>>().join(" ")
}

fn manager_for(tmp: &TempDir, chunk_size: usize, chunk_overlap: usize) -> IndexManager {
    IndexManager::new(IndexConfig {
        root_dir: tmp.path().join("corpus"),
        persist_dir: tmp.path().join("storage"),
        chunk_size,
        chunk_overlap,
        embed_batch: 8,
    })
}

fn write_corpus(tmp: &TempDir, files: &[(&str, &str)]) {
    let corpus = tmp.path().join("corpus");
    fs::create_dir_all(&corpus).unwrap();
    for (name, content) in files {
        fs::write(corpus.join(name), content).unwrap();
    }
}

#[tokio::test]
async fn build_then_reuse_performs_no_embedding_calls() {
    let tmp = TempDir::new().unwrap();
    write_corpus(&tmp, &[("a.txt", "alpha bravo charlie"), ("b.txt", "delta echo foxtrot")]);
    let manager = manager_for(&tmp, 512, 50);
    let provider = CountingProvider::new(64);

    let first = manager.ensure_index(&provider, false).await.expect("build");
    assert!(first.rebuilt);
    let calls_after_build = provider.calls();
    assert!(calls_after_build > 0);

    let second = manager.ensure_index(&provider, false).await.expect("reuse");
    assert!(!second.rebuilt);
    assert_eq!(provider.calls(), calls_after_build, "reuse must not embed anything");
    assert_eq!(second.manifest, first.manifest);
    assert_eq!(second.index.len(), first.index.len());
}

#[tokio::test]
async fn adding_a_file_triggers_rebuild() {
    let tmp = TempDir::new().unwrap();
    write_corpus(&tmp, &[("a.txt", "alpha bravo")]);
    let manager = manager_for(&tmp, 512, 50);
    let provider = CountingProvider::new(32);

    let first = manager.ensure_index(&provider, false).await.expect("build");
    assert!(first.rebuilt);

    write_corpus(&tmp, &[("b.txt", "charlie delta")]);
    let second = manager.ensure_index(&provider, false).await.expect("rebuild");
    assert!(second.rebuilt, "changed file set must invalidate the manifest");
    assert_eq!(second.manifest.files.len(), 2);
}

#[tokio::test]
async fn force_rebuild_replaces_a_matching_index() {
    let tmp = TempDir::new().unwrap();
    write_corpus(&tmp, &[("a.txt", "alpha bravo")]);
    let manager = manager_for(&tmp, 512, 50);
    let provider = CountingProvider::new(32);

    manager.ensure_index(&provider, false).await.expect("build");
    let calls = provider.calls();
    let again = manager.ensure_index(&provider, true).await.expect("force");
    assert!(again.rebuilt);
    assert!(provider.calls() > calls);
}

#[tokio::test]
async fn empty_root_is_a_config_error() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("corpus")).unwrap();
    let manager = manager_for(&tmp, 512, 50);
    let provider = CountingProvider::new(32);

    let err = manager.ensure_index(&provider, false).await.unwrap_err();
    match err {
        Error::Config(msg) => assert!(msg.contains("no eligible documents"), "got: {msg}"),
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[tokio::test]
async fn ambiguous_persist_dir_is_never_overwritten_implicitly() {
    let tmp = TempDir::new().unwrap();
    write_corpus(&tmp, &[("a.txt", "alpha bravo")]);
    let storage = tmp.path().join("storage");
    fs::create_dir_all(&storage).unwrap();
    fs::write(storage.join("unrelated.bin"), b"not an index").unwrap();

    let manager = manager_for(&tmp, 512, 50);
    let provider = CountingProvider::new(32);
    let err = manager.ensure_index(&provider, false).await.unwrap_err();
    assert!(matches!(err, Error::Persistence(_)));
    assert!(storage.join("unrelated.bin").exists(), "contents must be left untouched");
}

#[tokio::test]
async fn corrupt_manifest_is_a_persistence_error() {
    let tmp = TempDir::new().unwrap();
    write_corpus(&tmp, &[("a.txt", "alpha bravo")]);
    let storage = tmp.path().join("storage");
    fs::create_dir_all(&storage).unwrap();
    fs::write(storage.join("manifest.json"), b"{ not json").unwrap();

    let manager = manager_for(&tmp, 512, 50);
    let provider = CountingProvider::new(32);
    let err = manager.ensure_index(&provider, false).await.unwrap_err();
    assert!(matches!(err, Error::Persistence(_)));
}

#[tokio::test]
async fn concurrent_build_is_rejected_by_the_lock() {
    let tmp = TempDir::new().unwrap();
    write_corpus(&tmp, &[("a.txt", "alpha bravo")]);
    fs::write(tmp.path().join("storage.lock"), b"").unwrap();

    let manager = manager_for(&tmp, 512, 50);
    let provider = CountingProvider::new(32);
    let err = manager.ensure_index(&provider, false).await.unwrap_err();
    match err {
        Error::Persistence(msg) => assert!(msg.contains("lock"), "got: {msg}"),
        other => panic!("expected Persistence error, got {other:?}"),
    }
}

#[tokio::test]
async fn two_documents_chunk_to_four_bounded_chunks() {
    let tmp = TempDir::new().unwrap();
    // Two one-page documents of 1800 tokens each; chunk_size 1024 with
    // overlap 200 (stride 824) puts two windows in each document.
    let body = tokens(1800);
    write_corpus(&tmp, &[("one.txt", body.as_str()), ("two.txt", body.as_str())]);
    let manager = manager_for(&tmp, 1024, 200);
    let provider = CountingProvider::new(64);

    let built = manager.ensure_index(&provider, false).await.expect("build");
    assert_eq!(built.manifest.chunk_count, 4);
    assert_eq!(built.index.len(), 4);

    let results = built.index.query(&provider.inner.embed(&["tok0".to_string()]).await.unwrap()[0], 4).expect("query");
    assert!(results.iter().all(|r| r.chunk.token_count <= 1024));
}

#[tokio::test]
async fn stats_come_from_the_manifest_alone() {
    let tmp = TempDir::new().unwrap();
    write_corpus(&tmp, &[("a.txt", "alpha bravo charlie"), ("b.txt", "delta echo")]);
    let manager = manager_for(&tmp, 512, 50);
    let provider = CountingProvider::new(32);
    manager.ensure_index(&provider, false).await.expect("build");

    // Stats are read back from disk, without touching the corpus.
    fs::remove_dir_all(tmp.path().join("corpus")).unwrap();
    let manifest = IndexManifest::read(&tmp.path().join("storage")).expect("manifest");
    let stats = manifest.stats();
    assert_eq!(stats.document_count, 2);
    assert!(stats.chunk_count >= 2);
    assert!(stats.total_text_bytes > 0);
}

#[tokio::test]
async fn persisted_layout_has_store_and_manifest() {
    let tmp = TempDir::new().unwrap();
    write_corpus(&tmp, &[("a.txt", "alpha bravo")]);
    let manager = manager_for(&tmp, 512, 50);
    let provider = CountingProvider::new(32);
    manager.ensure_index(&provider, false).await.expect("build");

    let storage: PathBuf = tmp.path().join("storage");
    assert!(storage.join("manifest.json").is_file());
    assert!(storage.join("vector_store.json").is_file());
    assert!(!tmp.path().join("storage.lock").exists(), "lock released after build");
}
