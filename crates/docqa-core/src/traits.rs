use crate::error::Result;
use async_trait::async_trait;

/// Converts text into fixed-length vectors.
///
/// Implementations return one vector per input text, all of dimension
/// `dim()`, for the lifetime of the instance. An index built with one
/// provider is incompatible with queries embedded by another;
/// `provider_id()` is recorded in the index manifest and checked at load
/// time so the mismatch fails at construction, not as a silent wrong answer.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Stable identity, e.g. `local:bge-m3:d1024` or `hash:d256`.
    fn provider_id(&self) -> &str;

    /// Embedding dimensionality.
    fn dim(&self) -> usize;

    /// Compute embeddings for a batch of input texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
