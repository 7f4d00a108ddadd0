//! Embedding providers behind the `EmbeddingProvider` capability interface:
//! a local candle-backed model, a hosted HTTP API, and a deterministic
//! hashing embedder for tests and offline use.

pub mod api;
pub mod device;
pub mod hashing;
pub mod local;
pub mod pool;
pub mod tokenize;

use std::path::PathBuf;
use std::time::Duration;

use docqa_core::config::{require_env, Settings};
use docqa_core::error::{Error, Result};
use docqa_core::traits::EmbeddingProvider;

pub use api::ApiProvider;
pub use hashing::HashingProvider;
pub use local::LocalProvider;

/// Build the provider selected by `embedding.provider`. The `hash` variant
/// needs no credentials or model files.
pub fn provider_from_settings(settings: &Settings) -> Result<Box<dyn EmbeddingProvider>> {
    match settings.embedding.provider.as_str() {
        "hash" => Ok(Box::new(HashingProvider::new(settings.embedding.hash_dim))),
        "api" => {
            let api_key = require_env("APP_EMBED_API_KEY")?;
            let provider = ApiProvider::new(
                settings.embedding.api_base_url.clone(),
                settings.embedding.api_model.clone(),
                api_key,
                settings.embedding.api_dim,
                Duration::from_secs(settings.query.timeout_secs),
            )?;
            Ok(Box::new(provider))
        }
        "local" => {
            let dir = settings.embedding.model_dir.as_ref().map(PathBuf::from);
            Ok(Box::new(LocalProvider::new(dir.as_deref())?))
        }
        other => Err(Error::Config(format!("unknown embedding provider: {other}"))),
    }
}
