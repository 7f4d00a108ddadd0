//! Token-window chunking of page text.

use crate::error::{Error, Result};
use crate::types::{Chunk, Page};

/// Split a page into overlapping token windows of at most `chunk_size`
/// whitespace tokens, where consecutive chunks share exactly `overlap`
/// tokens. The final chunk may be shorter; a page with `chunk_size` tokens
/// or fewer yields a single chunk; an empty page yields nothing.
///
/// Deterministic: identical input and parameters always produce identical
/// chunk ids and text, which is what makes manifest-based reuse detection
/// meaningful across rebuilds.
pub fn chunk_page(
    source_file: &str,
    page: &Page,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>> {
    if chunk_size == 0 || overlap >= chunk_size {
        return Err(Error::Config(format!(
            "chunk_size ({chunk_size}) must be greater than chunk_overlap ({overlap})"
        )));
    }

    let tokens: Vec<&str> = page.text.split_whitespace().collect();
    let mut chunks = Vec::new();
    if tokens.is_empty() {
        return Ok(chunks);
    }

    let stride = chunk_size - overlap;
    let mut start = 0usize;
    loop {
        let end = (start + chunk_size).min(tokens.len());
        chunks.push(Chunk {
            id: format!("{}:{}:{}", source_file, page.page_number, start),
            source_file: source_file.to_string(),
            page_number: page.page_number,
            text: tokens[start..end].join(" "),
            token_count: end - start,
        });
        if end >= tokens.len() {
            break;
        }
        start += stride;
    }
    Ok(chunks)
}

/// Chunk every page of a document in order.
pub fn chunk_document(
    rel_path: &str,
    pages: &[Page],
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>> {
    let mut all = Vec::new();
    for page in pages {
        all.extend(chunk_page(rel_path, page, chunk_size, overlap)?);
    }
    Ok(all)
}
