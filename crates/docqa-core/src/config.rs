//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*`
//! environment variables (nested keys via `APP_SECTION__KEY`). Settings are
//! an explicit struct handed to constructors; nothing here is process-global.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub index: IndexSettings,
    #[serde(default)]
    pub query: QuerySettings,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Root directory scanned recursively for source documents.
    pub source_dir: String,
    /// Directory holding the persisted index and its manifest.
    pub persist_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { source_dir: "./corpus".to_string(), persist_dir: "./storage".to_string() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { chunk_size: 512, chunk_overlap: 50 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub top_k: usize,
    /// Timeout applied to each external embedding/LLM call.
    pub timeout_secs: u64,
    /// Bounded concurrency for batch processing.
    pub workers: usize,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self { top_k: 5, timeout_secs: 120, workers: 4 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// One of `local`, `api`, `hash`.
    pub provider: String,
    /// Model directory for the local provider; falls back to APP_MODEL_DIR.
    pub model_dir: Option<String>,
    pub api_base_url: String,
    pub api_model: String,
    pub api_dim: usize,
    pub hash_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model_dir: None,
            api_base_url: "https://api.openai.com/v1".to_string(),
            api_model: "text-embedding-3-small".to_string(),
            api_dim: 1536,
            hash_dim: 256,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 4000,
            temperature: 0.1,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        figment
            .extract()
            .map_err(|e| Error::Config(format!("failed to load settings: {e}")))
    }

    pub fn source_dir(&self) -> PathBuf {
        expand_path(&self.data.source_dir)
    }

    pub fn persist_dir(&self) -> PathBuf {
        expand_path(&self.data.persist_dir)
    }
}

/// Read a required credential from the environment, failing with an error
/// that names the missing variable.
pub fn require_env(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Config(format!("environment variable {name} is not set"))),
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
