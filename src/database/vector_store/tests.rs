use super::*;
use crate::embeddings::chunking::ChunkMetadata;
use tempfile::TempDir;

fn chunk(id: usize) -> Chunk {
    Chunk {
        text: format!("fn chunk_{}() {{}}", id),
        metadata: ChunkMetadata {
            source_path: format!("src/file_{}.rs", id),
            start_offset: id * 100,
            end_offset: id * 100 + 100,
        },
    }
}

fn vector(dimension: usize, seed: f32) -> Vec<f32> {
    (0..dimension).map(|i| seed + i as f32 * 0.01).collect()
}

fn populated_store() -> VectorStore {
    let mut store = VectorStore::new(4);
    let embeddings = vec![
        vec![0.0, 0.0, 0.0, 0.0],
        vec![1.0, 1.0, 1.0, 1.0],
        vec![2.0, 2.0, 2.0, 2.0],
    ];
    store
        .add(&embeddings, vec![chunk(0), chunk(1), chunk(2)])
        .expect("add should succeed");
    store
}

#[test]
fn new_store_is_empty() {
    let store = VectorStore::new(768);
    assert_eq!(store.dimension(), 768);
    assert_eq!(store.len(), 0);
    assert!(store.is_empty());
}

#[test]
fn add_keeps_vectors_and_chunks_in_step() {
    let store = populated_store();
    assert_eq!(store.len(), 3);
    assert_eq!(store.index.ntotal(), 3);
    assert_eq!(store.chunks()[1], chunk(1));
}

#[test]
fn add_rejects_mismatched_dimension_without_mutation() {
    let mut store = VectorStore::new(768);
    let embeddings = vec![vector(768, 0.1), vector(768, 0.2), vector(5, 0.3)];

    let result = store.add(&embeddings, vec![chunk(0), chunk(1), chunk(2)]);

    match result {
        Err(RagError::DimensionMismatch {
            location,
            expected,
            actual,
        }) => {
            assert_eq!(location, DimensionLocation::Batch(2));
            assert_eq!(expected, 768);
            assert_eq!(actual, 5);
        }
        other => panic!("expected DimensionMismatch, got {:?}", other),
    }
    assert_eq!(store.len(), 0);
    assert_eq!(store.index.ntotal(), 0);
}

#[test]
fn failed_add_leaves_existing_contents() {
    let mut store = populated_store();
    let result = store.add(&[vec![1.0, 2.0]], vec![chunk(9)]);
    assert!(result.is_err());
    assert_eq!(store.len(), 3);
    assert_eq!(store.index.ntotal(), 3);
}

#[test]
fn search_returns_nearest_first() {
    let store = populated_store();

    let results = store
        .search(&[1.9, 1.9, 1.9, 1.9], 2)
        .expect("search should succeed");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk, chunk(2));
    assert_eq!(results[1].chunk, chunk(1));
    assert!(results[0].distance <= results[1].distance);
    assert!(results.iter().all(|r| r.distance >= 0.0));
}

#[test]
fn search_with_k_above_count_returns_only_real_entries() {
    let mut store = VectorStore::new(3);
    store
        .add(
            &[vec![0.0, 0.0, 1.0], vec![0.0, 1.0, 0.0]],
            vec![chunk(0), chunk(1)],
        )
        .expect("add should succeed");

    let results = store
        .search(&[0.0, 0.0, 1.0], 5)
        .expect("search should succeed");

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.distance < f32::MAX));
}

#[test]
fn search_with_huge_k_is_bounded_by_store_size() {
    let store = populated_store();

    let results = store
        .search(&[0.0, 0.0, 0.0, 0.0], usize::MAX)
        .expect("search should succeed");

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].chunk, chunk(0));
}

#[test]
fn search_on_empty_store_is_empty_result() {
    let store = VectorStore::new(4);
    let result = store.search(&[0.0, 0.0, 0.0, 0.0], 5);
    assert!(matches!(result, Err(RagError::EmptyResult)));
}

#[test]
fn search_rejects_query_of_wrong_dimension() {
    let store = populated_store();
    let result = store.search(&[0.0, 0.0], 5);
    assert!(matches!(
        result,
        Err(RagError::DimensionMismatch {
            location: DimensionLocation::Query,
            expected: 4,
            actual: 2
        })
    ));
}

#[test]
fn save_then_load_reproduces_search() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = populated_store();
    let query = [0.4, 0.6, 0.5, 0.5];
    let before = store.search(&query, 5).expect("search should succeed");

    store
        .save(temp_dir.path(), "codebase_index")
        .expect("save should succeed");
    let loaded =
        VectorStore::load(temp_dir.path(), "codebase_index", 4).expect("load should succeed");
    let after = loaded.search(&query, 5).expect("search should succeed");

    assert_eq!(loaded.len(), store.len());
    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(&after) {
        assert_eq!(a.chunk, b.chunk);
        assert!((a.distance - b.distance).abs() < 1e-6);
    }
}

#[test]
fn save_writes_named_artifacts() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    populated_store()
        .save(temp_dir.path(), "my_index")
        .expect("save should succeed");

    assert!(temp_dir.path().join("my_index.index").is_file());
    assert!(temp_dir.path().join("my_index_meta.json").is_file());
    assert!(VectorStore::exists(temp_dir.path(), "my_index"));
    assert!(VectorStore::created_at(temp_dir.path(), "my_index").is_some());
}

#[test]
fn failed_save_keeps_previous_artifacts() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    populated_store()
        .save(temp_dir.path(), "stable")
        .expect("first save should succeed");

    // A directory where the staged metadata goes makes that write fail
    let (index_path, metadata_path) = VectorStore::artifact_paths(temp_dir.path(), "stable");
    fs::create_dir(staging_path(&metadata_path)).expect("should block metadata staging");

    let mut replacement = VectorStore::new(4);
    replacement
        .add(&vec![vec![9.0; 4]; 3], vec![chunk(7), chunk(8), chunk(9)])
        .expect("add should succeed");
    let result = replacement.save(temp_dir.path(), "stable");

    assert!(matches!(result, Err(RagError::Io(_))));
    assert!(!staging_path(&index_path).exists());
    let loaded = VectorStore::load(temp_dir.path(), "stable", 4).expect("old artifacts should load");
    assert_eq!(loaded.chunks(), populated_store().chunks());
    let hits = loaded
        .search(&[0.0, 0.0, 0.0, 0.0], 1)
        .expect("search should succeed");
    assert_eq!(hits[0].chunk, chunk(0));
}

#[test]
fn save_leaves_no_staged_files() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    populated_store()
        .save(temp_dir.path(), "clean")
        .expect("save should succeed");

    let names: Vec<String> = fs::read_dir(temp_dir.path())
        .expect("should list dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.iter().all(|name| !name.ends_with(".tmp")));
}

#[test]
fn load_missing_artifacts_is_not_found() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let result = VectorStore::load(temp_dir.path(), "absent", 4);
    assert!(matches!(result, Err(RagError::NotFound { .. })));
}

#[test]
fn load_with_only_index_blob_is_not_found() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    populated_store()
        .save(temp_dir.path(), "partial")
        .expect("save should succeed");
    fs::remove_file(temp_dir.path().join("partial_meta.json")).expect("should remove metadata");

    assert!(!VectorStore::exists(temp_dir.path(), "partial"));
    let result = VectorStore::load(temp_dir.path(), "partial", 4);
    assert!(matches!(result, Err(RagError::NotFound { .. })));
}

#[test]
fn load_with_different_dimension_fails() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    populated_store()
        .save(temp_dir.path(), "dims")
        .expect("save should succeed");

    let result = VectorStore::load(temp_dir.path(), "dims", 768);
    assert!(matches!(
        result,
        Err(RagError::DimensionMismatch {
            location: DimensionLocation::Persisted,
            expected: 768,
            actual: 4
        })
    ));
}

#[test]
fn load_detects_desynchronised_metadata() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    populated_store()
        .save(temp_dir.path(), "desync")
        .expect("save should succeed");

    let mut other = VectorStore::new(4);
    other
        .add(&[vec![0.0; 4]], vec![chunk(0)])
        .expect("add should succeed");
    let (index_path, _) = VectorStore::artifact_paths(temp_dir.path(), "desync");
    fs::write(
        index_path,
        other.index.to_bytes().expect("encode should succeed"),
    )
    .expect("should overwrite index blob");

    let result = VectorStore::load(temp_dir.path(), "desync", 4);
    assert!(matches!(result, Err(RagError::Corrupt(_))));
}
