//! Batch query processing: a bounded worker pool over an ordered prompt
//! list, with per-prompt failure isolation and a run-level summary.
//!
//! Results are keyed by input position, so the output order always matches
//! the input order no matter how workers interleave. Cancellation is
//! cooperative: in-flight prompts finish, queued prompts are recorded as
//! cancelled.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch, Semaphore};

use docqa_core::error::{Error, Result};
use docqa_core::types::{ResponseMode, RetrievedChunk};

use crate::engine::QueryEngine;

pub const DEFAULT_TOP_K: usize = 5;
const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct BatchPrompt {
    pub id: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub similarity_top_k: Option<usize>,
    pub response_mode: Option<ResponseMode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub file_name: String,
    pub page: u32,
    pub score: f32,
    pub text_preview: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchRecord {
    pub prompt_id: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub duration_seconds: f64,
    pub sources_count: usize,
    pub sources: Vec<SourceRef>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub input_metadata: HashMap<String, String>,
    pub status: BatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategorySummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub average_duration_seconds: f64,
    pub by_category: BTreeMap<String, CategorySummary>,
}

/// Load a prompt file: a JSON array of batch prompt records.
pub fn load_prompts(path: &Path) -> Result<Vec<BatchPrompt>> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::Config(format!("reading prompts file {}: {e}", path.display())))?;
    let prompts: Vec<BatchPrompt> = serde_json::from_slice(&bytes)
        .map_err(|e| Error::Config(format!("parsing prompts file {}: {e}", path.display())))?;
    Ok(prompts)
}

pub struct BatchProcessor {
    engine: Arc<QueryEngine>,
    workers: usize,
}

impl BatchProcessor {
    pub fn new(engine: Arc<QueryEngine>, workers: usize) -> Self {
        Self { engine, workers: workers.max(1) }
    }

    /// Run every prompt and return one record per input, in input order,
    /// plus the run summary. A single prompt's failure is isolated into an
    /// error record; the run continues.
    pub async fn process(
        &self,
        prompts: Vec<BatchPrompt>,
        cancel: watch::Receiver<bool>,
    ) -> (Vec<BatchRecord>, BatchSummary) {
        let total = prompts.len();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, BatchRecord)>();

        for (i, prompt) in prompts.into_iter().enumerate() {
            let engine = self.engine.clone();
            let semaphore = semaphore.clone();
            let tx = tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let record = if *cancel.borrow() {
                    cancelled_record(i, prompt)
                } else {
                    run_prompt(&engine, i, prompt).await
                };
                let _ = tx.send((i, record));
            });
        }
        drop(tx);

        let mut slots: Vec<Option<BatchRecord>> = (0..total).map(|_| None).collect();
        let mut finished = 0usize;
        while let Some((i, record)) = rx.recv().await {
            finished += 1;
            tracing::info!(
                prompt_id = %record.prompt_id,
                status = ?record.status,
                progress = format!("{finished}/{total}"),
                "prompt finished"
            );
            slots[i] = Some(record);
        }

        let records: Vec<BatchRecord> = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| slot.unwrap_or_else(|| missing_record(i)))
            .collect();
        let summary = summarize(&records);
        (records, summary)
    }
}

async fn run_prompt(engine: &QueryEngine, index: usize, p: BatchPrompt) -> BatchRecord {
    let prompt_id = p.id.clone().unwrap_or_else(|| format!("prompt_{}", index + 1));
    let top_k = p.similarity_top_k.unwrap_or(DEFAULT_TOP_K);
    let mode = p.response_mode.unwrap_or_default();
    let started = Instant::now();

    match engine.ask(&p.prompt, top_k, mode).await {
        Ok(answer) => BatchRecord {
            prompt_id,
            prompt: p.prompt,
            response: Some(answer.text),
            duration_seconds: answer.latency.as_secs_f64(),
            sources_count: answer.citations.len(),
            sources: answer.citations.iter().map(source_ref).collect(),
            input_metadata: p.metadata,
            status: BatchStatus::Success,
            error: None,
        },
        Err(e) => BatchRecord {
            prompt_id,
            prompt: p.prompt,
            response: None,
            duration_seconds: started.elapsed().as_secs_f64(),
            sources_count: 0,
            sources: vec![],
            input_metadata: p.metadata,
            status: BatchStatus::Error,
            error: Some(e.to_string()),
        },
    }
}

fn cancelled_record(index: usize, p: BatchPrompt) -> BatchRecord {
    BatchRecord {
        prompt_id: p.id.unwrap_or_else(|| format!("prompt_{}", index + 1)),
        prompt: p.prompt,
        response: None,
        duration_seconds: 0.0,
        sources_count: 0,
        sources: vec![],
        input_metadata: p.metadata,
        status: BatchStatus::Error,
        error: Some("cancelled before execution".to_string()),
    }
}

fn missing_record(index: usize) -> BatchRecord {
    BatchRecord {
        prompt_id: format!("prompt_{}", index + 1),
        prompt: String::new(),
        response: None,
        duration_seconds: 0.0,
        sources_count: 0,
        sources: vec![],
        input_metadata: HashMap::new(),
        status: BatchStatus::Error,
        error: Some("worker terminated unexpectedly".to_string()),
    }
}

fn source_ref(rc: &RetrievedChunk) -> SourceRef {
    SourceRef {
        file_name: rc.chunk.source_file.clone(),
        page: rc.chunk.page_number,
        score: rc.score,
        text_preview: preview(&rc.chunk.text),
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    }
}

fn summarize(records: &[BatchRecord]) -> BatchSummary {
    let total = records.len();
    let successful = records.iter().filter(|r| r.status == BatchStatus::Success).count();
    let failed = total - successful;
    let success_rate = if total == 0 { 0.0 } else { successful as f64 / total as f64 };
    let average_duration_seconds = if total == 0 {
        0.0
    } else {
        records.iter().map(|r| r.duration_seconds).sum::<f64>() / total as f64
    };

    let mut by_category: BTreeMap<String, CategorySummary> = BTreeMap::new();
    for record in records {
        if let Some(category) = record.input_metadata.get("category") {
            let entry = by_category.entry(category.clone()).or_default();
            entry.total += 1;
            match record.status {
                BatchStatus::Success => entry.successful += 1,
                BatchStatus::Error => entry.failed += 1,
            }
        }
    }

    BatchSummary { total, successful, failed, success_rate, average_duration_seconds, by_category }
}
