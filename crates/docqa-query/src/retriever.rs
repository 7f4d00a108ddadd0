use std::sync::Arc;

use docqa_core::error::{Error, Result};
use docqa_core::traits::EmbeddingProvider;
use docqa_core::types::RetrievedChunk;
use docqa_index::VectorIndex;

/// Embeds a question and returns the closest chunks from the index.
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
}

impl Retriever {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, index: Arc<VectorIndex>) -> Self {
        Self { provider, index }
    }

    /// Top-k retrieval for one question, ranked by descending score. An
    /// empty index yields an empty result, not an error.
    pub async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        if self.index.is_empty() {
            return Ok(vec![]);
        }
        let vectors = self.provider.embed(&[question.to_string()]).await?;
        let query_vec = vectors
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("provider returned no vector for the question"))?;
        self.index.query(&query_vec, top_k)
    }
}
