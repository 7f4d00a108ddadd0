//! Build manifest: records how the persisted index was built and from what,
//! so `ensure_index` can decide reuse vs rebuild without re-reading the
//! corpus.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docqa_core::error::{Error, Result};
use docqa_core::source::ScannedFile;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub provider_id: String,
    pub dim: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Relative path -> mtime in epoch milliseconds for every indexed file.
    pub files: BTreeMap<String, i64>,
    pub chunk_count: usize,
    pub total_text_bytes: u64,
    pub built_at: DateTime<Utc>,
}

/// Aggregate figures derived from the manifest alone; the stats surface
/// never re-reads the corpus.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub chunk_count: usize,
    pub total_text_bytes: u64,
    pub provider_id: String,
    pub dim: usize,
    pub built_at: DateTime<Utc>,
}

impl IndexManifest {
    /// True when the recorded build parameters and file set (path + mtime)
    /// exactly match a fresh scan for the same provider.
    pub fn matches(
        &self,
        provider_id: &str,
        dim: usize,
        chunk_size: usize,
        chunk_overlap: usize,
        scan: &[ScannedFile],
    ) -> bool {
        if self.provider_id != provider_id
            || self.dim != dim
            || self.chunk_size != chunk_size
            || self.chunk_overlap != chunk_overlap
        {
            return false;
        }
        if self.files.len() != scan.len() {
            return false;
        }
        scan.iter().all(|f| self.files.get(&f.rel_path) == Some(&f.mtime_millis))
    }

    /// Atomic write: temp file in the same directory, then rename, so a
    /// crash mid-write never leaves a manifest pointing at a partial index.
    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILE);
        let tmp = dir.join(format!("{MANIFEST_FILE}.tmp"));
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| Error::Persistence(format!("encoding manifest: {e}")))?;
        fs::write(&tmp, json)
            .map_err(|e| Error::Persistence(format!("writing {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .map_err(|e| Error::Persistence(format!("renaming into {}: {e}", path.display())))?;
        Ok(())
    }

    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let bytes = fs::read(&path)
            .map_err(|e| Error::Persistence(format!("reading {}: {e}", path.display())))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::Persistence(format!("corrupt manifest {}: {e}", path.display())))
    }

    pub fn exists(dir: &Path) -> bool {
        dir.join(MANIFEST_FILE).is_file()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            document_count: self.files.len(),
            chunk_count: self.chunk_count,
            total_text_bytes: self.total_text_bytes,
            provider_id: self.provider_id.clone(),
            dim: self.dim,
            built_at: self.built_at,
        }
    }
}
