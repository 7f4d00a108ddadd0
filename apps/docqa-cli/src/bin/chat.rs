use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use docqa_core::config::{require_env, Settings};
use docqa_core::types::{Answer, ResponseMode};
use docqa_embed::provider_from_settings;
use docqa_index::{IndexConfig, IndexManager, IndexStats};
use docqa_query::{ClaudeSynthesizer, QueryEngine, Retriever};

#[derive(Debug, Serialize)]
struct ChatEntry {
    timestamp: DateTime<Utc>,
    question: String,
    response: String,
    duration_seconds: f64,
    sources_count: usize,
    sources: Vec<ChatSource>,
}

#[derive(Debug, Serialize)]
struct ChatSource {
    file_name: String,
    page: u32,
    score: f32,
}

#[derive(Debug, Serialize)]
struct ChatSession<'a> {
    session_start: DateTime<Utc>,
    session_end: DateTime<Utc>,
    total_questions: usize,
    chat_history: &'a [ChatEntry],
}

fn entry_from_answer(question: &str, answer: &Answer) -> ChatEntry {
    ChatEntry {
        timestamp: Utc::now(),
        question: question.to_string(),
        response: answer.text.clone(),
        duration_seconds: answer.latency.as_secs_f64(),
        sources_count: answer.citations.len(),
        sources: answer
            .citations
            .iter()
            .map(|c| ChatSource {
                file_name: c.chunk.source_file.clone(),
                page: c.chunk.page_number,
                score: c.score,
            })
            .collect(),
    }
}

fn save_session(started: DateTime<Utc>, history: &[ChatEntry]) -> anyhow::Result<String> {
    let filename = format!("chat_session_{}.json", Utc::now().format("%Y%m%d_%H%M%S"));
    let session = ChatSession {
        session_start: started,
        session_end: Utc::now(),
        total_questions: history.len(),
        chat_history: history,
    };
    std::fs::write(&filename, serde_json::to_vec_pretty(&session)?)?;
    Ok(filename)
}

fn print_stats(stats: &IndexStats) {
    println!("\n📊 Index statistics:");
    println!("  documents: {}", stats.document_count);
    println!("  chunks: {}", stats.chunk_count);
    println!("  content size: {:.1} MB", stats.total_text_bytes as f64 / (1024.0 * 1024.0));
    println!("  embedding provider: {}", stats.provider_id);
    println!("  built at: {}", stats.built_at.format("%Y-%m-%d %H:%M:%S UTC"));
}

fn show_help() {
    println!("\n📋 Commands:");
    println!("  help    - Show this help message");
    println!("  stats   - Show index statistics");
    println!("  history - Show recent questions");
    println!("  save    - Save the current session");
    println!("  quit    - End the session");
    println!("\n💡 Anything else is asked against the indexed documents.");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    println!("🚀 Starting docqa chat...");

    let settings = Settings::load().map_err(|e| { eprintln!("Error loading config: {e}"); e })?;
    let api_key = require_env("ANTHROPIC_API_KEY")?;

    let provider = provider_from_settings(&settings)?;
    let manager = IndexManager::new(IndexConfig::from_settings(&settings));
    let ensured = manager.ensure_index(provider.as_ref(), false).await?;
    let stats = ensured.manifest.stats();

    let timeout = Duration::from_secs(settings.query.timeout_secs);
    let synthesizer = Arc::new(ClaudeSynthesizer::new(api_key, &settings.llm, timeout)?);
    let retriever = Retriever::new(Arc::from(provider), Arc::new(ensured.index));
    let engine = QueryEngine::new(retriever, synthesizer);

    println!("\n{}", "=".repeat(70));
    println!("📚 DOCQA CHAT");
    println!("{}", "=".repeat(70));
    println!("Index: {} documents, {} chunks", stats.document_count, stats.chunk_count);
    println!("Model: {}", settings.llm.model);
    println!("Type 'help' for commands, 'quit' to exit.");
    println!("{}", "-".repeat(70));

    let session_start = Utc::now();
    let mut history: Vec<ChatEntry> = Vec::new();

    loop {
        print!("\nask> ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" | "q" => break,
            "help" => {
                show_help();
                continue;
            }
            "stats" => {
                print_stats(&stats);
                continue;
            }
            "history" => {
                println!("\n📜 Recent questions ({} total):", history.len());
                for (i, entry) in history.iter().rev().take(5).enumerate() {
                    println!("  {}. {}", i + 1, entry.question);
                }
                continue;
            }
            "save" => {
                match save_session(session_start, &history) {
                    Ok(filename) => println!("💾 Session saved to: {filename}"),
                    Err(e) => println!("⚠️  Could not save session: {e}"),
                }
                continue;
            }
            _ => {}
        }

        println!("🔍 Searching indexed documents...");
        match engine.ask(input, settings.query.top_k, ResponseMode::Compact).await {
            Ok(answer) => {
                println!("\n📖 {}", answer.text);
                if !answer.citations.is_empty() {
                    println!("\n📚 Sources:");
                    for (i, source) in answer.citations.iter().take(3).enumerate() {
                        println!(
                            "  {}. {} (Page {}) - Score: {:.2}",
                            i + 1,
                            source.chunk.source_file,
                            source.chunk.page_number,
                            source.score
                        );
                    }
                }
                println!("\n⏱️  {:.2}s", answer.latency.as_secs_f64());
                history.push(entry_from_answer(input, &answer));
            }
            Err(e) => println!("❌ Error: {e}"),
        }
    }

    if !history.is_empty() {
        match save_session(session_start, &history) {
            Ok(filename) => println!("\n💾 Chat session saved to: {filename}"),
            Err(e) => println!("\n⚠️  Could not save session: {e}"),
        }
    }
    println!("\n📊 Questions asked: {}", history.len());
    println!("👋 Goodbye!");
    Ok(())
}
