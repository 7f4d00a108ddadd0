use std::fs;
use tempfile::TempDir;

use docqa_core::chunker::{chunk_document, chunk_page};
use docqa_core::config::require_env;
use docqa_core::error::Error;
use docqa_core::source::DocumentSource;
use docqa_core::types::{Page, ResponseMode};

fn page_of_tokens(n: usize) -> Page {
    let text = (0..n).map(|i| format!("tok{i}")).collect::<Vec<_>>().join(" ");
    Page { page_number: 1, text }
}

#[test]
fn short_page_yields_single_chunk() {
    let page = page_of_tokens(100);
    let chunks = chunk_page("a.pdf", &page, 512, 50).expect("chunk");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].token_count, 100);
    assert_eq!(chunks[0].id, "a.pdf:1:0");
}

#[test]
fn empty_page_yields_nothing() {
    let page = Page { page_number: 3, text: "   \n\t ".to_string() };
    let chunks = chunk_page("a.pdf", &page, 512, 50).expect("chunk");
    assert!(chunks.is_empty());
}

#[test]
fn consecutive_chunks_share_exactly_overlap_tokens() {
    let page = page_of_tokens(1800);
    let chunks = chunk_page("doc.pdf", &page, 1024, 200).expect("chunk");
    assert_eq!(chunks.len(), 2, "1800 tokens with stride 824 is two windows");
    for c in &chunks {
        assert!(c.token_count <= 1024);
    }
    let first: Vec<&str> = chunks[0].text.split_whitespace().collect();
    let second: Vec<&str> = chunks[1].text.split_whitespace().collect();
    assert_eq!(&first[first.len() - 200..], &second[..200]);
}

#[test]
fn two_documents_chunk_independently() {
    // Two one-page documents, chunked with the same parameters, each come
    // out as two bounded chunks with the overlap law holding per document.
    let pages = vec![page_of_tokens(1800)];
    let a = chunk_document("a.pdf", &pages, 1024, 200).expect("chunk a");
    let b = chunk_document("b.pdf", &pages, 1024, 200).expect("chunk b");
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 2);
    assert!(a.iter().all(|c| c.source_file == "a.pdf"));
    assert!(b.iter().all(|c| c.source_file == "b.pdf"));
}

#[test]
fn chunking_is_deterministic() {
    let page = page_of_tokens(3000);
    let first = chunk_page("x.txt", &page, 256, 32).expect("chunk");
    let second = chunk_page("x.txt", &page, 256, 32).expect("chunk");
    assert_eq!(first, second, "same ids, same text, same order");
}

#[test]
fn overlap_must_be_smaller_than_chunk_size() {
    let page = page_of_tokens(10);
    let err = chunk_page("x.txt", &page, 100, 100).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn scan_filters_and_sorts() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("sub")).unwrap();
    fs::write(dir.join("b.txt"), "bravo").unwrap();
    fs::write(dir.join("sub/a.txt"), "alpha").unwrap();
    fs::write(dir.join("ignore.dat"), "binary").unwrap();

    let source = DocumentSource::new(dir);
    let files = source.scan().expect("scan");
    let rels: Vec<&str> = files.iter().map(|f| f.rel_path.as_str()).collect();
    assert_eq!(rels, vec!["b.txt", "sub/a.txt"]);
    assert!(files.iter().all(|f| f.mtime_millis > 0));
}

#[test]
fn scan_missing_root_is_config_error() {
    let source = DocumentSource::new("/nonexistent/docqa-test-root");
    let err = source.scan().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn text_file_reads_as_single_page() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("notes.md"), "one two three").unwrap();
    let source = DocumentSource::new(tmp.path());
    let files = source.scan().expect("scan");
    let doc = source.read_document(&files[0]).expect("read");
    assert_eq!(doc.pages.len(), 1);
    assert_eq!(doc.pages[0].page_number, 1);
    assert_eq!(doc.pages[0].text, "one two three");
}

#[test]
fn require_env_names_missing_variable() {
    let err = require_env("DOCQA_TEST_NEVER_SET").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("DOCQA_TEST_NEVER_SET"), "error must name the variable: {msg}");
}

#[test]
fn response_mode_round_trips() {
    for mode in ["compact", "tree_summarize", "simple_summarize", "no_text"] {
        let parsed = ResponseMode::parse(mode).expect("parse");
        assert_eq!(parsed.as_str(), mode);
    }
    assert!(ResponseMode::parse("refine").is_none());
}
