//! Anthropic messages-API answer synthesizer.
//!
//! Context chunks are numbered `[Source N]` and the model is instructed to
//! ground its answer in them alone; the citations returned are the subset of
//! context the answer actually references. Rate limits, 5xx responses and
//! timeouts are retried with bounded backoff.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use docqa_core::config::LlmSettings;
use docqa_core::error::{Error, Result};
use docqa_core::retry::Backoff;
use docqa_core::types::{ResponseMode, RetrievedChunk};

use crate::synth::{cited_subset, AnswerSynthesizer, Synthesis};

const ANTHROPIC_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You are a document analysis assistant. Answer strictly \
from the numbered source passages supplied with each question. Cite every passage \
you rely on inline as [Source N]. If the passages do not contain the answer, say \
so plainly instead of guessing.";

/// Character budget for simple_summarize context truncation.
const SUMMARIZE_CONTEXT_BUDGET: usize = 12_000;
/// Chunks per partial answer in tree_summarize.
const TREE_GROUP: usize = 3;

pub struct ClaudeSynthesizer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    backoff: Backoff,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

impl ClaudeSynthesizer {
    pub fn new(api_key: String, llm: &LlmSettings, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::synthesis(format!("building http client: {e}")))?;
        Ok(Self {
            client,
            base_url: "https://api.anthropic.com".to_string(),
            api_key,
            model: llm.model.clone(),
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
            backoff: Backoff::default(),
        })
    }

    /// Point at a different endpoint (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "system": SYSTEM_PROMPT,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::synthesis_transient(format!("LLM request timed out: {e}"))
                } else {
                    Error::synthesis_transient(format!("LLM request failed: {e}"))
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let msg = format!("LLM API returned {status}: {text}");
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                Error::synthesis_transient(msg)
            } else {
                Error::synthesis(msg)
            });
        }

        let parsed: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| Error::synthesis(format!("malformed LLM response: {e}")))?;
        let text = parsed
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("")
            .trim()
            .to_string();
        if text.is_empty() {
            return Err(Error::synthesis("LLM returned an empty answer"));
        }
        Ok(text)
    }

    async fn tree_summarize(&self, question: &str, context: &[RetrievedChunk]) -> Result<String> {
        if context.len() <= TREE_GROUP {
            let prompt = question_prompt(question, &render_context(context, 0, None));
            return self.backoff.run(|| self.complete(&prompt)).await;
        }
        let mut partials = Vec::new();
        for (gi, group) in context.chunks(TREE_GROUP).enumerate() {
            // Source numbering stays global so citations survive the
            // combine step.
            let block = render_context(group, gi * TREE_GROUP, None);
            let prompt = question_prompt(question, &block);
            let partial = self.backoff.run(|| self.complete(&prompt)).await?;
            partials.push(partial);
        }
        let combined = partials
            .iter()
            .enumerate()
            .map(|(i, p)| format!("Partial answer {}:\n{}\n\n", i + 1, p))
            .collect::<String>();
        let prompt = format!(
            "Partial answers derived from disjoint groups of source passages:\n\n\
             {combined}Question: {question}\n\n\
             Combine the partial answers into one grounded answer, keeping the \
             [Source N] citations that support each point."
        );
        self.backoff.run(|| self.complete(&prompt)).await
    }
}

#[async_trait]
impl AnswerSynthesizer for ClaudeSynthesizer {
    async fn synthesize(
        &self,
        question: &str,
        context: &[RetrievedChunk],
        mode: ResponseMode,
    ) -> Result<Synthesis> {
        if mode == ResponseMode::NoText {
            return Ok(Synthesis { text: String::new(), citations: context.to_vec() });
        }
        let text = match mode {
            ResponseMode::Compact | ResponseMode::NoText => {
                let prompt = question_prompt(question, &render_context(context, 0, None));
                self.backoff.run(|| self.complete(&prompt)).await?
            }
            ResponseMode::SimpleSummarize => {
                let block = render_context(context, 0, Some(SUMMARIZE_CONTEXT_BUDGET));
                let prompt = question_prompt(question, &block);
                self.backoff.run(|| self.complete(&prompt)).await?
            }
            ResponseMode::TreeSummarize => self.tree_summarize(question, context).await?,
        };
        let citations = cited_subset(&text, context);
        Ok(Synthesis { text, citations })
    }
}

fn render_context(context: &[RetrievedChunk], start_index: usize, budget: Option<usize>) -> String {
    let mut out = String::new();
    for (i, rc) in context.iter().enumerate() {
        let block = format!(
            "[Source {}] {} (page {})\n{}\n\n",
            start_index + i + 1,
            rc.chunk.source_file,
            rc.chunk.page_number,
            rc.chunk.text
        );
        if let Some(limit) = budget {
            if !out.is_empty() && out.len() + block.len() > limit {
                break;
            }
        }
        out.push_str(&block);
    }
    out
}

fn question_prompt(question: &str, context_block: &str) -> String {
    format!(
        "Source passages:\n\n{context_block}Question: {question}\n\n\
         Answer using only the source passages above, citing them as [Source N]."
    )
}
