//! Flat vector index with on-disk JSON persistence.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use docqa_core::error::{Error, Result};
use docqa_core::types::{Chunk, RetrievedChunk};

pub const STORE_FILE: &str = "vector_store.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Flat vector index over embedded chunks.
///
/// Inserts happen only during index build; `query` is read-only and cannot
/// corrupt the index. Similarity is cosine mapped into `[0, 1]` via
/// `(cos + 1) / 2`; equal scores keep insertion order (stable sort), so
/// identical inputs always produce identical rankings.
#[derive(Debug, Serialize, Deserialize)]
pub struct VectorIndex {
    dim: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, entries: Vec::new() }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert embedded chunks. Every vector must match the index dimension.
    pub fn insert(&mut self, pairs: Vec<(Chunk, Vec<f32>)>) -> Result<()> {
        for (chunk, vector) in pairs {
            if vector.len() != self.dim {
                return Err(Error::DimensionMismatch {
                    expected: self.dim,
                    actual: vector.len(),
                });
            }
            self.entries.push(IndexEntry { chunk, vector });
        }
        Ok(())
    }

    /// Return up to `top_k` chunks ranked by descending score. `top_k`
    /// larger than the index is clamped rather than rejected; an empty index
    /// yields an empty result.
    pub fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: vector.len() });
        }
        if self.entries.is_empty() || top_k == 0 {
            return Ok(vec![]);
        }
        let k = top_k.min(self.entries.len());
        let mut scored: Vec<RetrievedChunk> = self
            .entries
            .iter()
            .map(|e| RetrievedChunk {
                chunk: e.chunk.clone(),
                score: cosine_score(vector, &e.vector),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    /// Write the store into `dir` via temp-file-then-rename.
    pub fn persist(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .map_err(|e| Error::Persistence(format!("creating {}: {e}", dir.display())))?;
        let path = dir.join(STORE_FILE);
        let tmp = dir.join(format!("{STORE_FILE}.tmp"));
        let json = serde_json::to_vec(self)
            .map_err(|e| Error::Persistence(format!("encoding vector store: {e}")))?;
        fs::write(&tmp, json)
            .map_err(|e| Error::Persistence(format!("writing {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .map_err(|e| Error::Persistence(format!("renaming into {}: {e}", path.display())))?;
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(STORE_FILE);
        let bytes = fs::read(&path)
            .map_err(|e| Error::Persistence(format!("reading {}: {e}", path.display())))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::Persistence(format!("corrupt vector store {}: {e}", path.display())))
    }
}

/// Cosine similarity mapped into [0,1]; 0.5 means orthogonal.
fn cosine_score(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0f32;
    let mut norm_a = 0f32;
    let mut norm_b = 0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = (norm_a.sqrt() * norm_b.sqrt()).max(1e-12);
    let cos = dot / denom;
    ((cos + 1.0) / 2.0).clamp(0.0, 1.0)
}
