//! Unit tests for background favicon fetching after bookmark mutations.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use bookmarks::managers::bookmark_manager::{BookmarkManager, BookmarkManagerTrait};
use bookmarks::services::favicon_tasks::{FaviconOutcome, FaviconTasks};
use bookmarks::store::{FaviconRepository, SqliteBookmarkStore};
use bookmarks::types::favicon::FaviconArtifact;
use common::{create, fixture, folder, node, png_bytes, Fixture, OWNER};

fn with_refresh(fx: &Fixture) -> BookmarkManager<SqliteBookmarkStore> {
    let tasks = Arc::new(FaviconTasks::new(fx.repo.clone(), fx.favicons.clone()));
    BookmarkManager::new(fx.repo.clone(), fx.favicons.clone()).with_background_refresh(tasks)
}

async fn drain(mgr: &BookmarkManager<SqliteBookmarkStore>) -> Vec<FaviconOutcome> {
    mgr.favicon_tasks().expect("refresh enabled").shutdown().await
}

#[tokio::test]
async fn test_favicon_is_assigned_after_create() {
    let fx = fixture();
    fx.fetcher.html("http://h/p", r#"<link rel="icon" href="/img/x.png">"#);
    fx.fetcher.image("http://h/img/x.png", "image/png", png_bytes(100, 50));
    let mgr = with_refresh(&fx);

    let created = create(&mgr, node("/", "Page", "http://h/p"));
    assert!(created.favicon.is_empty());

    let outcomes = drain(&mgr).await;
    assert_eq!(outcomes.len(), 1);
    let favicon = match &outcomes[0] {
        FaviconOutcome::Assigned { id, favicon } => {
            assert_eq!(id, &created.id);
            favicon.clone()
        }
        other => panic!("expected assignment, got {:?}", other),
    };

    let stored = mgr.get_bookmark_by_id(&created.id, OWNER).unwrap();
    assert_eq!(stored.favicon, favicon);
    let artifact = fx.durable.get(&favicon).unwrap().expect("durable favicon");
    let img = image::load_from_memory(&artifact.payload).unwrap();
    assert_eq!((img.width(), img.height()), (50, 25));
    assert_eq!(std::fs::read_dir(fx.staging.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_no_refresh_for_folders_or_existing_favicons() {
    let fx = fixture();
    fx.durable
        .save(&FaviconArtifact {
            id: "known.ico".to_string(),
            payload: vec![1],
            last_modified: 1,
        })
        .unwrap();
    let mgr = with_refresh(&fx);

    create(&mgr, folder("/", "A"));
    let mut input = node("/", "Known", "http://h/p");
    input.favicon = "existing://known.ico".to_string();
    create(&mgr, input);

    assert_eq!(mgr.favicon_tasks().unwrap().pending(), 0);
    assert!(fx.fetcher.requests().is_empty());
}

#[tokio::test]
async fn test_fetch_failure_is_reported_not_raised() {
    let fx = fixture();
    let mgr = with_refresh(&fx);

    let created = create(&mgr, node("/", "Offline", "http://offline/p"));
    let outcomes = drain(&mgr).await;

    assert!(matches!(&outcomes[..], [FaviconOutcome::Failed { .. }]));
    assert!(mgr.get_bookmark_by_id(&created.id, OWNER).unwrap().favicon.is_empty());
}

#[tokio::test]
async fn test_deleted_bookmark_discards_fetched_favicon() {
    let fx = fixture();
    fx.fetcher.image("http://h/favicon.ico", "image/x-icon", vec![0, 0, 1, 0]);
    let mgr = with_refresh(&fx);

    let created = create(&mgr, node("/", "Gone", "http://h/p"));
    mgr.delete(&created.id, OWNER).unwrap();

    let outcomes = drain(&mgr).await;
    assert!(matches!(&outcomes[..], [FaviconOutcome::Skipped { .. }]));

    let count: i64 = fx
        .db
        .connection()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM favicons", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_fetch_and_forward_schedules_refresh() {
    let fx = fixture();
    fx.fetcher.image("http://h/favicon.ico", "image/x-icon", vec![0, 0, 1, 0]);
    let plain = &fx.manager;
    let created = create(plain, node("/", "Later", "http://h/p"));

    let mgr = with_refresh(&fx);
    assert_eq!(mgr.fetch_and_forward(&created.id, OWNER).unwrap(), "http://h/p");
    let outcomes = drain(&mgr).await;
    assert!(matches!(&outcomes[..], [FaviconOutcome::Assigned { .. }]));
}

#[test]
fn test_without_runtime_refresh_is_skipped() {
    let fx = fixture();
    let mgr = with_refresh(&fx);

    let created = create(&mgr, node("/", "Sync", "http://h/p"));
    assert!(!created.id.is_empty());
    assert_eq!(mgr.favicon_tasks().unwrap().pending(), 0);
}
