//! Corpus enumeration and per-page text extraction.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::{Page, SourceDocument};

/// Extensions eligible for indexing. PDFs are extracted page by page; plain
/// text and markdown files are treated as a single page.
const ELIGIBLE_EXTS: [&str; 3] = ["pdf", "txt", "md"];

/// One entry from a corpus scan. The `(rel_path, mtime_millis)` pair is the
/// identity the manifest compares to decide reuse vs rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub mtime_millis: i64,
}

pub struct DocumentSource {
    root: PathBuf,
}

impl DocumentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerate eligible files under the root, recursively, sorted by
    /// relative path for a stable scan order.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        if !self.root.is_dir() {
            return Err(Error::Config(format!(
                "source directory does not exist: {}",
                self.root.display()
            )));
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let Some(ext) = path.extension().and_then(|s| s.to_str()) else { continue };
            if !ELIGIBLE_EXTS.contains(&ext.to_ascii_lowercase().as_str()) {
                continue;
            }
            let meta = fs::metadata(path)
                .map_err(|e| Error::Operation(format!("stat {}: {e}", path.display())))?;
            let modified = meta
                .modified()
                .map_err(|e| Error::Operation(format!("mtime {}: {e}", path.display())))?;
            let mtime_millis = modified
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);
            let rel_path = path
                .strip_prefix(&self.root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            files.push(ScannedFile { rel_path, abs_path: path.to_path_buf(), mtime_millis });
        }
        files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        Ok(files)
    }

    /// Read one scanned file into per-page text. Pages with no extractable
    /// text are dropped.
    pub fn read_document(&self, file: &ScannedFile) -> Result<SourceDocument> {
        let ext = file
            .abs_path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();
        let pages = if ext == "pdf" {
            read_pdf_pages(&file.abs_path)?
        } else {
            read_text_page(&file.abs_path)?
        };
        Ok(SourceDocument { rel_path: file.rel_path.clone(), pages })
    }
}

fn read_pdf_pages(path: &Path) -> Result<Vec<Page>> {
    let texts = pdf_extract::extract_text_by_pages(path).map_err(|e| {
        Error::Operation(format!("pdf extraction failed for {}: {e}", path.display()))
    })?;
    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Page { page_number: i as u32 + 1, text })
        .filter(|p| !p.text.trim().is_empty())
        .collect())
}

fn read_text_page(path: &Path) -> Result<Vec<Page>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => {
            let bytes = fs::read(path)
                .map_err(|e| Error::Operation(format!("read {}: {e}", path.display())))?;
            String::from_utf8_lossy(&bytes).to_string()
        }
    };
    if content.trim().is_empty() {
        return Ok(vec![]);
    }
    Ok(vec![Page { page_number: 1, text: content }])
}
