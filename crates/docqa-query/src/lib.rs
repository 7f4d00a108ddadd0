//! Query path: retrieval, grounded answer synthesis, and batch processing
//! over a persisted vector index.

pub mod batch;
pub mod claude;
pub mod engine;
pub mod retriever;
pub mod synth;

pub use batch::{BatchProcessor, BatchPrompt, BatchRecord, BatchStatus, BatchSummary};
pub use claude::ClaudeSynthesizer;
pub use engine::QueryEngine;
pub use retriever::Retriever;
pub use synth::{AnswerSynthesizer, Synthesis};
