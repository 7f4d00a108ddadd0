use std::env;
use std::sync::Arc;
use std::time::Duration;

use docqa_core::config::{require_env, Settings};
use docqa_core::types::ResponseMode;
use docqa_embed::provider_from_settings;
use docqa_index::{IndexConfig, IndexManager};
use docqa_query::{ClaudeSynthesizer, QueryEngine, Retriever};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} '<question>' [--top-k N] [--mode compact|tree_summarize|simple_summarize|no_text]", args[0]);
        eprintln!("Example: {} 'What does chapter 2 say about planning?' --top-k 5", args[0]);
        std::process::exit(1);
    }
    let question = &args[1];
    let settings = Settings::load()?;
    let mut top_k = settings.query.top_k;
    let mut mode = ResponseMode::Compact;
    let mut i = 2; while i < args.len() { match args[i].as_str() {
        "--top-k" => { if i + 1 < args.len() { if let Ok(k) = args[i + 1].parse::<usize>() { top_k = k; i += 1; } else { eprintln!("Error: --top-k requires a number"); std::process::exit(1); } } else { eprintln!("Error: --top-k requires a number"); std::process::exit(1); } }
        "--mode" => { if i + 1 < args.len() { match ResponseMode::parse(&args[i + 1]) { Some(m) => { mode = m; i += 1; } None => { eprintln!("Error: unknown response mode '{}'", args[i + 1]); std::process::exit(1); } } } else { eprintln!("Error: --mode requires a value"); std::process::exit(1); } }
        _ => {} } i += 1; }

    // no_text never reaches the LLM, so the credential is only required for
    // the synthesizing modes.
    let api_key = if mode == ResponseMode::NoText {
        env::var("ANTHROPIC_API_KEY").unwrap_or_default()
    } else {
        require_env("ANTHROPIC_API_KEY")?
    };

    let provider = provider_from_settings(&settings)?;
    let manager = IndexManager::new(IndexConfig::from_settings(&settings));
    let ensured = manager.ensure_index(provider.as_ref(), false).await?;

    let timeout = Duration::from_secs(settings.query.timeout_secs);
    let synthesizer = Arc::new(ClaudeSynthesizer::new(api_key, &settings.llm, timeout)?);
    let retriever = Retriever::new(Arc::from(provider), Arc::new(ensured.index));
    let engine = QueryEngine::new(retriever, synthesizer);

    println!("🔍 Searching {} chunks...", ensured.manifest.chunk_count);
    let answer = engine.ask(question, top_k, mode).await?;

    println!("\n{}", "-".repeat(70));
    println!("Answer:");
    println!("{}", "-".repeat(70));
    println!("{}", answer.text);

    if !answer.citations.is_empty() {
        println!("\n📚 Sources ({} cited):", answer.citations.len());
        for (i, source) in answer.citations.iter().enumerate() {
            println!(
                "  {}. {} (Page {}) - Score: {:.2}",
                i + 1,
                source.chunk.source_file,
                source.chunk.page_number,
                source.score
            );
        }
    }
    println!("\n⏱️  Response time: {:.2}s", answer.latency.as_secs_f64());
    Ok(())
}
