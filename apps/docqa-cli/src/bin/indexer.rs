use std::{env, path::PathBuf};

use docqa_core::config::Settings;
use docqa_embed::provider_from_settings;
use docqa_index::{IndexConfig, IndexManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let settings = Settings::load().map_err(|e| { eprintln!("Error loading config: {e}"); e })?;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut force_rebuild = false; let mut root = None;
    let mut i = 0; while i < args.len() { match args[i].as_str() {
        "--rebuild" | "-r" => force_rebuild = true,
        _ if !args[i].starts_with('-') => root = Some(PathBuf::from(&args[i])), _ => {} } i += 1; }

    let mut cfg = IndexConfig::from_settings(&settings);
    if let Some(root) = root { cfg.root_dir = root; }

    println!("docqa indexer\n=============");
    println!("Corpus: {}", cfg.root_dir.display());
    println!("Persist dir: {}", cfg.persist_dir.display());
    if force_rebuild { println!("⚠️  Forcing a full rebuild (--rebuild)"); }

    let provider = provider_from_settings(&settings)?;
    println!("Embedding provider: {}", provider.provider_id());

    let manager = IndexManager::new(cfg);
    let ensured = manager.ensure_index(provider.as_ref(), force_rebuild).await?;
    let stats = ensured.manifest.stats();
    if ensured.rebuilt {
        println!("\n✅ Index rebuilt: {} documents, {} chunks ({} bytes of text)",
            stats.document_count, stats.chunk_count, stats.total_text_bytes);
    } else {
        println!("\n✅ Existing index is up to date: {} documents, {} chunks",
            stats.document_count, stats.chunk_count);
    }
    println!("\n💡 Ask a question with: cargo run --bin docqa-ask -- '<question>'");
    Ok(())
}
