//! Persistence round-trip and edge case tests.

use std::path::PathBuf;
use tempfile::TempDir;

use crate::error::StoreError;
use crate::persistence::{ensure_dir, load_json, save_json};
use footfall_core::{Listing, VisitCount};

#[tokio::test]
async fn test_save_and_load_json_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("visits.json");

    let listing = Listing::new(vec![VisitCount::new("Alice", 3), VisitCount::new("Bob", 1)]);

    save_json(&file_path, &listing).await.unwrap();
    let loaded: Listing<VisitCount> = load_json(&file_path).await.unwrap();

    assert_eq!(loaded, listing);
}

#[tokio::test]
async fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let nested_path = temp_dir.path().join("deeply").join("nested").join("data.json");

    save_json(&nested_path, &serde_json::json!({"total": 0, "data": []}))
        .await
        .unwrap();

    assert!(nested_path.exists());
}

#[tokio::test]
async fn test_save_overwrites_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("data.json");

    save_json(&file_path, &Listing::new(vec![VisitCount::new("old", 1)]))
        .await
        .unwrap();
    save_json(&file_path, &Listing::<VisitCount>::default())
        .await
        .unwrap();

    let loaded: Listing<VisitCount> = load_json(&file_path).await.unwrap();
    assert_eq!(loaded.total, 0);
}

#[tokio::test]
async fn test_load_nonexistent_file() {
    let file_path = PathBuf::from("/nonexistent/path/data.json");

    let result: Result<Listing<VisitCount>, _> = load_json(&file_path).await;
    match result {
        Err(StoreError::File { path, .. }) => assert_eq!(path, file_path),
        other => panic!("expected file error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_load_invalid_json() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("data.json");
    tokio::fs::write(&file_path, "{ not json").await.unwrap();

    let result: Result<Listing<VisitCount>, _> = load_json(&file_path).await;
    assert!(matches!(result, Err(StoreError::Serialization(_))));
}

#[tokio::test]
async fn test_ensure_dir_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let new_dir = temp_dir.path().join("out").join("reports");

    ensure_dir(&new_dir).await.unwrap();
    assert!(new_dir.is_dir());

    // Idempotent
    ensure_dir(&new_dir).await.unwrap();
}
