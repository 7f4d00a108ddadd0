use tempfile::TempDir;

use docqa_core::error::Error;
use docqa_core::types::Chunk;
use docqa_index::VectorIndex;

fn chunk(id: &str, text: &str) -> Chunk {
    Chunk {
        id: id.to_string(),
        source_file: "doc.pdf".to_string(),
        page_number: 1,
        text: text.to_string(),
        token_count: text.split_whitespace().count(),
    }
}

#[test]
fn query_rejects_wrong_dimension() {
    let mut index = VectorIndex::new(3);
    index.insert(vec![(chunk("a", "alpha"), vec![1.0, 0.0, 0.0])]).expect("insert");

    let err = index.query(&[1.0, 0.0], 5).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));
}

#[test]
fn insert_rejects_wrong_dimension() {
    let mut index = VectorIndex::new(3);
    let err = index.insert(vec![(chunk("a", "alpha"), vec![1.0])]).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { .. }));
}

#[test]
fn top_k_is_clamped_to_index_size() {
    let mut index = VectorIndex::new(2);
    index
        .insert(vec![
            (chunk("a", "alpha"), vec![1.0, 0.0]),
            (chunk("b", "bravo"), vec![0.0, 1.0]),
            (chunk("c", "charlie"), vec![0.7, 0.7]),
        ])
        .expect("insert");

    let results = index.query(&[1.0, 0.0], 1000).expect("query");
    assert_eq!(results.len(), 3);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score, "descending order");
    }
    assert_eq!(results[0].chunk.id, "a");
}

#[test]
fn scores_stay_in_unit_interval() {
    let mut index = VectorIndex::new(2);
    index
        .insert(vec![
            (chunk("same", "same"), vec![1.0, 0.0]),
            (chunk("opposite", "opposite"), vec![-1.0, 0.0]),
            (chunk("orthogonal", "orthogonal"), vec![0.0, 1.0]),
        ])
        .expect("insert");

    let results = index.query(&[1.0, 0.0], 3).expect("query");
    assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.score)));
    assert_eq!(results[0].chunk.id, "same");
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert_eq!(results[2].chunk.id, "opposite");
    assert!(results[2].score.abs() < 1e-6);
}

#[test]
fn equal_scores_keep_insertion_order() {
    let mut index = VectorIndex::new(2);
    index
        .insert(vec![
            (chunk("first", "copy"), vec![0.0, 1.0]),
            (chunk("second", "copy"), vec![0.0, 1.0]),
            (chunk("third", "copy"), vec![0.0, 1.0]),
        ])
        .expect("insert");

    let results = index.query(&[0.0, 1.0], 3).expect("query");
    let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
}

#[test]
fn empty_index_query_is_empty_not_an_error() {
    let index = VectorIndex::new(4);
    let results = index.query(&[0.1, 0.2, 0.3, 0.4], 5).expect("query");
    assert!(results.is_empty());
}

#[test]
fn persist_then_load_round_trips_query_results() {
    let tmp = TempDir::new().unwrap();
    let mut index = VectorIndex::new(3);
    index
        .insert(vec![
            (chunk("a", "water filtration basics"), vec![0.9, 0.1, 0.3]),
            (chunk("b", "solar panel wiring"), vec![0.2, 0.8, 0.1]),
            (chunk("c", "food preservation"), vec![0.4, 0.4, 0.6]),
        ])
        .expect("insert");
    index.persist(tmp.path()).expect("persist");

    let loaded = VectorIndex::load(tmp.path()).expect("load");
    assert_eq!(loaded.dim(), 3);
    assert_eq!(loaded.len(), 3);

    let q = [0.5, 0.2, 0.9];
    let before = index.query(&q, 3).expect("query");
    let after = loaded.query(&q, 3).expect("query");
    assert_eq!(before.len(), after.len());
    for (x, y) in before.iter().zip(after.iter()) {
        assert_eq!(x.chunk.id, y.chunk.id);
        assert!((x.score - y.score).abs() < 1e-6);
    }
}

#[test]
fn load_missing_store_is_persistence_error() {
    let tmp = TempDir::new().unwrap();
    let err = VectorIndex::load(tmp.path()).unwrap_err();
    assert!(matches!(err, Error::Persistence(_)));
}
