use bookmarks::types::errors::*;

// === ErrorKind Tests ===

#[test]
fn error_kind_status_codes() {
    assert_eq!(ErrorKind::Validation.status_code(), 400);
    assert_eq!(ErrorKind::NotFound.status_code(), 404);
    assert_eq!(ErrorKind::Server.status_code(), 500);
    assert_eq!(ErrorKind::RateLimited.status_code(), 429);
    assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
}

// === StoreError Tests ===

#[test]
fn store_error_display_variants() {
    assert_eq!(StoreError::NotFound("bm-1".to_string()).to_string(), "no entry found for 'bm-1'");
    assert_eq!(StoreError::LockPoisoned.to_string(), "database lock poisoned");
}

#[test]
fn store_error_from_rusqlite() {
    let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(matches!(err, StoreError::Sqlite(_)));
}

// === FaviconError Tests ===

#[test]
fn favicon_error_kinds() {
    assert_eq!(FaviconError::NotFound("x".to_string()).kind(), ErrorKind::NotFound);
    assert_eq!(FaviconError::InvalidDimensions { x: -1, y: 0 }.kind(), ErrorKind::Validation);
    assert_eq!(FaviconError::EmptyPayload("x".to_string()).kind(), ErrorKind::Server);
    assert_eq!(
        FaviconError::NotAnImage {
            url: "http://h/x".to_string(),
            content_type: "application/octet-stream".to_string(),
        }
        .kind(),
        ErrorKind::Server
    );
}

#[test]
fn favicon_error_display() {
    let err = FaviconError::Status {
        url: "http://h/favicon.ico".to_string(),
        status: 404,
    };
    assert_eq!(err.to_string(), "request to 'http://h/favicon.ico' returned status 404");
}

// === BookmarkError Tests ===

#[test]
fn bookmark_error_display_variants() {
    assert_eq!(
        BookmarkError::validation("missing path").to_string(),
        "validation failed: missing path"
    );
    assert_eq!(BookmarkError::not_found("bm-1").to_string(), "not found: bm-1");
}

#[test]
fn bookmark_error_from_store_error() {
    let missing: BookmarkError = StoreError::NotFound("bm-1".to_string()).into();
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    let broken: BookmarkError = StoreError::LockPoisoned.into();
    assert_eq!(broken.kind(), ErrorKind::Server);
    assert_eq!(broken.status_code(), 500);
}

#[test]
fn bookmark_error_from_favicon_error() {
    let err: BookmarkError = FaviconError::InvalidId("existing://".to_string()).into();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err: BookmarkError = FaviconError::EmptyPayload("x".to_string()).into();
    assert_eq!(err.kind(), ErrorKind::Server);
}

#[test]
fn bookmark_error_with_context_wraps_server_only() {
    let err = BookmarkError::server("store failed", StoreError::LockPoisoned)
        .with_context("error creating a new bookmark");
    assert_eq!(
        err.to_string(),
        "error creating a new bookmark: store failed: database lock poisoned"
    );

    let err = BookmarkError::validation("bad").with_context("ignored");
    assert_eq!(err.to_string(), "validation failed: bad");
}

#[test]
fn bookmark_error_exposes_source() {
    use std::error::Error;
    let err = BookmarkError::server("store failed", StoreError::LockPoisoned);
    assert!(err.source().is_some());
    assert!(BookmarkError::not_found("x").source().is_none());
}

// === SettingsError Tests ===

#[test]
fn settings_error_display_variants() {
    assert_eq!(
        SettingsError::InvalidKey("a.b".to_string()).to_string(),
        "invalid settings key: a.b"
    );
    assert_eq!(
        SettingsError::Io("disk full".to_string()).to_string(),
        "settings i/o error: disk full"
    );
}
