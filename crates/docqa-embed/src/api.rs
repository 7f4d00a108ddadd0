//! Hosted embeddings adapter (OpenAI-style `/embeddings` endpoint).
//!
//! Rate limits, 5xx responses and timeouts are treated as transient and
//! retried with bounded backoff; validation failures surface immediately.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use docqa_core::error::{Error, Result};
use docqa_core::retry::Backoff;
use docqa_core::traits::EmbeddingProvider;

#[derive(Debug)]
pub struct ApiProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    dim: usize,
    id: String,
    backoff: Backoff,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl ApiProvider {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: String,
        dim: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::embedding(format!("building http client: {e}")))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        let id = format!("api:{model}:d{dim}");
        Ok(Self { client, base_url, model, api_key, dim, id, backoff: Backoff::default() })
    }

    async fn call(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = json!({ "model": self.model, "input": texts });
        let resp = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::embedding_transient(format!("embeddings request timed out: {e}"))
                } else {
                    Error::embedding_transient(format!("embeddings request failed: {e}"))
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let msg = format!("embeddings API returned {status}: {text}");
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                Error::embedding_transient(msg)
            } else {
                Error::embedding(msg)
            });
        }

        let parsed: EmbeddingsResponse = resp
            .json()
            .await
            .map_err(|e| Error::embedding(format!("malformed embeddings response: {e}")))?;
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        let vectors: Vec<Vec<f32>> = data.into_iter().map(|d| d.embedding).collect();

        if vectors.len() != texts.len() {
            return Err(Error::embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        for v in &vectors {
            if v.len() != self.dim {
                return Err(Error::embedding(format!(
                    "provider returned dimension {}, expected {}",
                    v.len(),
                    self.dim
                )));
            }
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for ApiProvider {
    fn provider_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.backoff.run(|| self.call(texts)).await
    }
}
