//! Unit tests for the local favicon staging area.

use bookmarks::services::favicon_cache::LocalFaviconCache;
use bookmarks::types::errors::FaviconError;
use tempfile::TempDir;

fn cache() -> (TempDir, LocalFaviconCache) {
    let dir = TempDir::new().unwrap();
    let cache = LocalFaviconCache::new(dir.path().join("staging")).unwrap();
    (dir, cache)
}

#[test]
fn test_new_creates_directory() {
    let (dir, cache) = cache();
    assert!(dir.path().join("staging").is_dir());
    assert_eq!(cache.root(), dir.path().join("staging"));
}

#[test]
fn test_write_then_read() {
    let (_dir, cache) = cache();
    let written = cache.write_local("favicon.ico", b"icon-bytes").unwrap();
    assert_eq!(written.name, LocalFaviconCache::content_id("favicon.ico", b"icon-bytes"));
    assert!(written.name.ends_with(".ico"));

    let read = cache.read_local(&written.name).unwrap();
    assert_eq!(read.payload, b"icon-bytes");
    assert!(read.modified > 0);
}

#[test]
fn test_same_payload_and_name_yield_same_id() {
    let (_dir, cache) = cache();
    let first = cache.write_local("a.png", b"same").unwrap();
    let second = cache.write_local("a.png", b"same").unwrap();
    let renamed = cache.write_local("b.png", b"same").unwrap();

    assert_eq!(first.name, second.name);
    assert_ne!(first.name, renamed.name);
    assert_eq!(std::fs::read_dir(cache.root()).unwrap().count(), 2);
}

#[test]
fn test_empty_payload_is_rejected() {
    let (_dir, cache) = cache();
    assert!(matches!(cache.write_local("a.png", b""), Err(FaviconError::EmptyPayload(_))));
}

#[test]
fn test_zero_length_file_is_corrupt() {
    let (_dir, cache) = cache();
    std::fs::write(cache.root().join("broken.png"), b"").unwrap();
    assert!(matches!(cache.read_local("broken.png"), Err(FaviconError::EmptyPayload(_))));
}

#[test]
fn test_missing_artifact() {
    let (_dir, cache) = cache();
    assert!(matches!(cache.read_local("nope.png"), Err(FaviconError::NotFound(_))));
    assert!(matches!(cache.remove_local("nope.png"), Err(FaviconError::NotFound(_))));
}

#[test]
fn test_remove_local() {
    let (_dir, cache) = cache();
    let written = cache.write_local("a.png", b"x").unwrap();
    cache.remove_local(&written.name).unwrap();
    assert!(!cache.root().join(&written.name).exists());
}

#[test]
fn test_ids_cannot_escape_staging() {
    let (_dir, cache) = cache();
    for id in ["", ".", "..", "../secret", "a/b", "a\\b"] {
        assert!(
            matches!(cache.read_local(id), Err(FaviconError::InvalidId(_))),
            "id {:?} should be rejected",
            id
        );
    }
}
