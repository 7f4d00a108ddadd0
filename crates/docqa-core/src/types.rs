//! Domain types shared by the build and query paths.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub type ChunkId = String;

/// One page of extracted document text. `page_number` is 1-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub page_number: u32,
    pub text: String,
}

/// A source document, read once during index build and immutable afterward.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Path relative to the corpus root.
    pub rel_path: String,
    pub pages: Vec<Page>,
}

/// A bounded, overlapping segment of page text.
///
/// - `id`: derived from `source_file`, page number and token offset; unique
///   and stable across rebuilds of unchanged input
/// - `token_count`: number of whitespace tokens, always `<= chunk_size`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub source_file: String,
    pub page_number: u32,
    pub text: String,
    pub token_count: usize,
}

/// A chunk returned from a similarity query. `score` is in `[0, 1]`,
/// higher is closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// How the synthesizer condenses retrieved context into an answer.
///
/// `NoText` skips the LLM entirely and returns the retrieved chunks as
/// citations with empty answer text, for pure retrieval testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    #[default]
    Compact,
    TreeSummarize,
    SimpleSummarize,
    NoText,
}

impl ResponseMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "compact" => Some(ResponseMode::Compact),
            "tree_summarize" => Some(ResponseMode::TreeSummarize),
            "simple_summarize" => Some(ResponseMode::SimpleSummarize),
            "no_text" => Some(ResponseMode::NoText),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Compact => "compact",
            ResponseMode::TreeSummarize => "tree_summarize",
            ResponseMode::SimpleSummarize => "simple_summarize",
            ResponseMode::NoText => "no_text",
        }
    }
}

/// A synthesized answer together with the chunks that backed it.
/// `citations` is always a subsequence of the retrieved context.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<RetrievedChunk>,
    pub latency: Duration,
}
