//! Build-vs-reuse orchestration for the persisted index.
//!
//! The common path loads an index whose manifest matches the current corpus
//! scan without a single embedding call. A rebuild embeds everything into a
//! staging sibling directory and atomically swaps it in, under an advisory
//! lock so two builds cannot race on the same persist dir.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};

use docqa_core::chunker::chunk_document;
use docqa_core::config::Settings;
use docqa_core::error::{Error, Result};
use docqa_core::source::{DocumentSource, ScannedFile};
use docqa_core::traits::EmbeddingProvider;
use docqa_core::types::Chunk;

use crate::manifest::{IndexManifest, MANIFEST_FILE};
use crate::store::VectorIndex;

/// Location and chunking parameters for one index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub root_dir: PathBuf,
    pub persist_dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Chunks embedded per provider call during build.
    pub embed_batch: usize,
}

impl IndexConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            root_dir: settings.source_dir(),
            persist_dir: settings.persist_dir(),
            chunk_size: settings.index.chunk_size,
            chunk_overlap: settings.index.chunk_overlap,
            embed_batch: 32,
        }
    }
}

#[derive(Debug)]
pub struct EnsuredIndex {
    pub index: VectorIndex,
    pub manifest: IndexManifest,
    pub rebuilt: bool,
}

pub struct IndexManager {
    cfg: IndexConfig,
}

impl IndexManager {
    pub fn new(cfg: IndexConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.cfg
    }

    /// Load the persisted index when its manifest exactly matches the
    /// current scan, otherwise rebuild from scratch.
    pub async fn ensure_index(
        &self,
        provider: &dyn EmbeddingProvider,
        force_rebuild: bool,
    ) -> Result<EnsuredIndex> {
        let source = DocumentSource::new(&self.cfg.root_dir);
        let scan = source.scan()?;
        if scan.is_empty() {
            return Err(Error::Config(format!(
                "no eligible documents under {}",
                self.cfg.root_dir.display()
            )));
        }

        if !force_rebuild {
            if let Some(manifest) = self.try_read_manifest()? {
                if manifest.matches(
                    provider.provider_id(),
                    provider.dim(),
                    self.cfg.chunk_size,
                    self.cfg.chunk_overlap,
                    &scan,
                ) {
                    tracing::info!(
                        persist_dir = %self.cfg.persist_dir.display(),
                        chunks = manifest.chunk_count,
                        "manifest matches corpus scan, reusing persisted index"
                    );
                    let index = VectorIndex::load(&self.cfg.persist_dir)?;
                    return Ok(EnsuredIndex { index, manifest, rebuilt: false });
                }
                tracing::info!("manifest out of date, rebuilding index");
            }
        }

        self.rebuild(&source, &scan, provider).await
    }

    /// Read the manifest if one exists. A persist dir with contents but no
    /// recognizable manifest is ambiguous state and is never implicitly
    /// overwritten.
    fn try_read_manifest(&self) -> Result<Option<IndexManifest>> {
        let dir = &self.cfg.persist_dir;
        if !dir.exists() {
            return Ok(None);
        }
        if IndexManifest::exists(dir) {
            return IndexManifest::read(dir).map(Some);
        }
        let occupied = fs::read_dir(dir)
            .map_err(|e| Error::Persistence(format!("reading {}: {e}", dir.display())))?
            .next()
            .is_some();
        if occupied {
            return Err(Error::Persistence(format!(
                "{} exists but holds no recognizable index manifest ({MANIFEST_FILE}); \
                 pass force_rebuild to replace it",
                dir.display()
            )));
        }
        Ok(None)
    }

    async fn rebuild(
        &self,
        source: &DocumentSource,
        scan: &[ScannedFile],
        provider: &dyn EmbeddingProvider,
    ) -> Result<EnsuredIndex> {
        let _lock = BuildLock::acquire(&self.cfg.persist_dir)?;

        let mut all_chunks: Vec<Chunk> = Vec::new();
        let mut files = BTreeMap::new();
        let mut total_text_bytes = 0u64;
        for file in scan {
            let doc = source.read_document(file)?;
            total_text_bytes += doc.pages.iter().map(|p| p.text.len() as u64).sum::<u64>();
            let chunks =
                chunk_document(&doc.rel_path, &doc.pages, self.cfg.chunk_size, self.cfg.chunk_overlap)?;
            tracing::debug!(file = %doc.rel_path, chunks = chunks.len(), "chunked document");
            all_chunks.extend(chunks);
            files.insert(file.rel_path.clone(), file.mtime_millis);
        }
        if all_chunks.is_empty() {
            return Err(Error::Config(format!(
                "no eligible documents with extractable text under {}",
                self.cfg.root_dir.display()
            )));
        }

        let mut index = VectorIndex::new(provider.dim());
        let pb = ProgressBar::new(all_chunks.len() as u64);
        pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}").unwrap().progress_chars("#>-"));
        for batch in all_chunks.chunks(self.cfg.embed_batch) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = provider.embed(&texts).await?;
            let pairs: Vec<(Chunk, Vec<f32>)> = batch.iter().cloned().zip(vectors).collect();
            index.insert(pairs)?;
            pb.inc(batch.len() as u64);
        }
        pb.finish_with_message("embedding completed");

        // Stage next to the persist dir (same filesystem), manifest last,
        // then swap the finished directory in.
        let staging = staging_dir(&self.cfg.persist_dir);
        if staging.exists() {
            fs::remove_dir_all(&staging)
                .map_err(|e| Error::Persistence(format!("clearing {}: {e}", staging.display())))?;
        }
        index.persist(&staging)?;
        let manifest = IndexManifest {
            provider_id: provider.provider_id().to_string(),
            dim: provider.dim(),
            chunk_size: self.cfg.chunk_size,
            chunk_overlap: self.cfg.chunk_overlap,
            files,
            chunk_count: index.len(),
            total_text_bytes,
            built_at: Utc::now(),
        };
        manifest.write(&staging)?;
        if self.cfg.persist_dir.exists() {
            fs::remove_dir_all(&self.cfg.persist_dir).map_err(|e| {
                Error::Persistence(format!("replacing {}: {e}", self.cfg.persist_dir.display()))
            })?;
        }
        fs::rename(&staging, &self.cfg.persist_dir).map_err(|e| {
            Error::Persistence(format!(
                "moving staged index into {}: {e}",
                self.cfg.persist_dir.display()
            ))
        })?;

        tracing::info!(
            files = scan.len(),
            chunks = index.len(),
            persist_dir = %self.cfg.persist_dir.display(),
            "index rebuilt"
        );
        Ok(EnsuredIndex { index, manifest, rebuilt: true })
    }
}

fn sibling_path(persist_dir: &Path, suffix: &str) -> PathBuf {
    let name = persist_dir
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("index");
    persist_dir.with_file_name(format!("{name}{suffix}"))
}

fn staging_dir(persist_dir: &Path) -> PathBuf {
    sibling_path(persist_dir, &format!(".staging-{}", std::process::id()))
}

/// Advisory build lock: at most one build per persist dir. Held for the
/// whole build-and-swap sequence, released on drop.
struct BuildLock {
    path: PathBuf,
}

impl BuildLock {
    fn acquire(persist_dir: &Path) -> Result<Self> {
        let path = sibling_path(persist_dir, ".lock");
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::Persistence(format!("creating {}: {e}", parent.display())))?;
            }
        }
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path: path.clone() }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(Error::Persistence(
                format!("another build holds the lock at {}", path.display()),
            )),
            Err(e) => Err(Error::Persistence(format!(
                "creating build lock {}: {e}",
                path.display()
            ))),
        }
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
