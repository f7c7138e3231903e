//! Contract tests shared by both `Storage` implementors: discovery,
//! byte-blob CRUD, and child scoping must agree (spec §4.1, §6).

use std::collections::HashMap;

use graphrag_index::pipeline::Cancellation;
use graphrag_index::storage::fs::FsStorage;
use graphrag_index::storage::memory::MemoryStorage;
use graphrag_index::storage::Storage;
use regex::Regex;

async fn exercise(storage: &dyn Storage) {
    let cancellation = Cancellation::new();

    assert!(storage.get("missing.json").await.unwrap().is_none());
    assert!(!storage.has("missing.json").await.unwrap());

    storage.set("a.txt", b"alpha".to_vec()).await.unwrap();
    storage.set("b.txt", b"beta".to_vec()).await.unwrap();
    storage.set("c.csv", b"gamma".to_vec()).await.unwrap();

    assert!(storage.has("a.txt").await.unwrap());
    assert_eq!(storage.get("a.txt").await.unwrap(), Some(b"alpha".to_vec()));

    let pattern = Regex::new(r".*\.txt$").unwrap();
    let mut matches = storage
        .find(&pattern, None, None, None, &cancellation)
        .await
        .unwrap();
    matches.sort_by(|a, b| a.path.cmp(&b.path));
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].path, "a.txt");
    assert_eq!(matches[1].path, "b.txt");

    storage.delete("a.txt").await.unwrap();
    assert!(!storage.has("a.txt").await.unwrap());

    let child = storage.create_child("sub");
    child.set("nested.txt", b"delta".to_vec()).await.unwrap();
    assert!(child.has("nested.txt").await.unwrap());
    assert!(!storage.has("nested.txt").await.unwrap());

    child.clear().await.unwrap();
    assert!(!child.has("nested.txt").await.unwrap());
    assert!(storage.has("b.txt").await.unwrap());
}

#[tokio::test]
async fn memory_storage_satisfies_contract() {
    let storage = MemoryStorage::new();
    exercise(&storage).await;
}

#[tokio::test]
async fn fs_storage_satisfies_contract() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FsStorage::new(dir.path());
    exercise(&storage).await;
}

#[tokio::test]
async fn find_filter_matches_named_capture_group_case_insensitively() {
    let storage = MemoryStorage::new();
    storage.set("docs/en.txt", b"hello".to_vec()).await.unwrap();
    storage.set("docs/fr.txt", b"bonjour".to_vec()).await.unwrap();

    let pattern = Regex::new(r"docs/(?P<lang>\w+)\.txt$").unwrap();
    let mut filter = HashMap::new();
    filter.insert("lang".to_string(), "EN".to_string());

    let cancellation = Cancellation::new();
    let matches = storage
        .find(&pattern, None, Some(&filter), None, &cancellation)
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].path, "docs/en.txt");
}
