use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use docqa_core::config::{require_env, Settings};
use docqa_embed::provider_from_settings;
use docqa_index::{IndexConfig, IndexManager};
use docqa_query::batch::load_prompts;
use docqa_query::{BatchProcessor, ClaudeSynthesizer, QueryEngine, Retriever};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <prompts.json> [--workers N] [--output results.jsonl]", args[0]);
        eprintln!("Example: {} prompts.json --workers 4", args[0]);
        std::process::exit(1);
    }
    let prompts_file = PathBuf::from(&args[1]);
    let settings = Settings::load()?;
    let mut workers = settings.query.workers;
    let mut output: Option<PathBuf> = None;
    let mut i = 2; while i < args.len() { match args[i].as_str() {
        "--workers" => { if i + 1 < args.len() { if let Ok(n) = args[i + 1].parse::<usize>() { workers = n; i += 1; } else { eprintln!("Error: --workers requires a number"); std::process::exit(1); } } else { eprintln!("Error: --workers requires a number"); std::process::exit(1); } }
        "--output" => { if i + 1 < args.len() { output = Some(PathBuf::from(&args[i + 1])); i += 1; } else { eprintln!("Error: --output requires a path"); std::process::exit(1); } }
        _ => {} } i += 1; }

    // Credential and index problems abort the whole run up front; only
    // per-prompt failures are isolated once processing starts.
    let api_key = require_env("ANTHROPIC_API_KEY")?;
    let prompts = load_prompts(&prompts_file)?;
    println!("📋 Loaded {} prompts from {}", prompts.len(), prompts_file.display());

    let provider = provider_from_settings(&settings)?;
    let manager = IndexManager::new(IndexConfig::from_settings(&settings));
    let ensured = manager.ensure_index(provider.as_ref(), false).await?;
    println!("📂 Index ready: {} chunks (read-only)", ensured.manifest.chunk_count);

    let timeout = Duration::from_secs(settings.query.timeout_secs);
    let synthesizer = Arc::new(ClaudeSynthesizer::new(api_key, &settings.llm, timeout)?);
    let retriever = Retriever::new(Arc::from(provider), Arc::new(ensured.index));
    let engine = Arc::new(QueryEngine::new(retriever, synthesizer));

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n🛑 Cancelling: in-flight prompts will finish, queued prompts are skipped");
            let _ = cancel_tx.send(true);
        }
    });

    let results_path = output.unwrap_or_else(|| {
        let dir = PathBuf::from("logs");
        dir.join(format!("query_results_{}.jsonl", Utc::now().format("%Y%m%d_%H%M%S")))
    });
    if let Some(parent) = results_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    println!("🚀 Processing {} prompts with {} workers", prompts.len(), workers);
    let processor = BatchProcessor::new(engine, workers);
    let (records, summary) = processor.process(prompts, cancel_rx).await;

    let mut file = fs::File::create(&results_path)?;
    for record in &records {
        writeln!(file, "{}", serde_json::to_string(record)?)?;
    }
    writeln!(file, "{}", serde_json::to_string(&summary)?)?;

    println!("\n{}", "=".repeat(70));
    println!("BATCH PROCESSING COMPLETED");
    println!("{}", "=".repeat(70));
    println!("Total prompts: {}", summary.total);
    println!("Successful: {}", summary.successful);
    println!("Failed: {}", summary.failed);
    println!("Success rate: {:.1}%", summary.success_rate * 100.0);
    println!("Average duration: {:.2}s", summary.average_duration_seconds);
    if !summary.by_category.is_empty() {
        println!("By category:");
        for (category, cat) in &summary.by_category {
            println!("  {category}: {}/{} successful", cat.successful, cat.total);
        }
    }
    println!("Results saved to: {}", results_path.display());
    Ok(())
}
