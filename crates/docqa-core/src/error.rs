use thiserror::Error;

/// Error taxonomy for the indexing and query pipeline.
///
/// `Config` and `Persistence` are fatal: surfaced immediately, never retried,
/// never auto-repaired. `Embedding` and `Synthesis` carry a `retryable` flag
/// so adapters can apply bounded backoff to transient backend failures
/// (rate limits, timeouts) while validation failures surface at once.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("embedding failed: {message}")]
    Embedding { message: String, retryable: bool },

    #[error("answer synthesis failed: {message}")]
    Synthesis { message: String, retryable: bool },

    #[error("index persistence: {0}")]
    Persistence(String),

    #[error("query vector has dimension {actual}, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn embedding(message: impl Into<String>) -> Self {
        Error::Embedding { message: message.into(), retryable: false }
    }

    pub fn embedding_transient(message: impl Into<String>) -> Self {
        Error::Embedding { message: message.into(), retryable: true }
    }

    pub fn synthesis(message: impl Into<String>) -> Self {
        Error::Synthesis { message: message.into(), retryable: false }
    }

    pub fn synthesis_transient(message: impl Into<String>) -> Self {
        Error::Synthesis { message: message.into(), retryable: true }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Embedding { retryable: true, .. } | Error::Synthesis { retryable: true, .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
