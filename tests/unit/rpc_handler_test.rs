//! Unit tests for the JSON-RPC method dispatcher.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use bookmarks::app::App;
use bookmarks::database::Database;
use bookmarks::rpc_handler::{base64_decode, base64_encode, handle_method, RateLimiter, RpcError};
use bookmarks::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use bookmarks::types::errors::ErrorKind;
use bookmarks::types::settings::AppSettings;
use common::{png_bytes, CannedFetcher};
use serde_json::{json, Value};
use tempfile::TempDir;

fn app() -> (TempDir, Arc<CannedFetcher>, App) {
    let staging = TempDir::new().unwrap();
    let fetcher = Arc::new(CannedFetcher::new());
    let mut settings = AppSettings::default();
    settings.favicon.background_refresh = false;
    let db = Arc::new(Database::open_in_memory().unwrap());
    let app = App::assemble(settings, db, staging.path().to_path_buf(), fetcher.clone()).unwrap();
    (staging, fetcher, app)
}

async fn call(app: &App, method: &str, params: Value) -> Value {
    handle_method(app, method, &params)
        .await
        .unwrap_or_else(|e| panic!("{} failed: {:?}", method, e))
}

#[test]
fn test_base64_round_trip() {
    let encoded = base64_encode(b"favicon");
    assert_eq!(base64_decode(&encoded).unwrap(), b"favicon");
    assert!(base64_decode("***").is_err());
}

#[tokio::test]
async fn test_ping() {
    let (_dir, _fetcher, app) = app();
    let result = call(&app, "ping", json!({})).await;
    assert_eq!(result["ok"], json!(true));
}

#[tokio::test]
async fn test_create_list_and_rename() {
    let (_dir, _fetcher, app) = app();
    let folder = call(
        &app,
        "bookmarks.create",
        json!({"owner": "alice", "bookmark": {"path": "/", "display_name": "A", "kind": "folder"}}),
    )
    .await;
    call(
        &app,
        "bookmarks.create",
        json!({"owner": "alice", "bookmark": {"path": "/A", "display_name": "Rust", "url": "https://rust-lang.org"}}),
    )
    .await;

    let listed = call(&app, "bookmarks.by_path", json!({"owner": "alice", "path": "/A"})).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["kind"], json!("node"));

    let mut update = folder.clone();
    update["display_name"] = json!("A2");
    call(&app, "bookmarks.update", json!({"owner": "alice", "bookmark": update})).await;

    let paths = call(&app, "bookmarks.paths", json!({"owner": "alice"})).await;
    assert_eq!(paths, json!(["/", "/A2"]));
    let moved = call(&app, "bookmarks.by_path", json!({"owner": "alice", "path": "/A2"})).await;
    assert_eq!(moved[0]["display_name"], json!("Rust"));
}

#[tokio::test]
async fn test_root_folder_view() {
    let (_dir, _fetcher, app) = app();
    let root = call(&app, "bookmarks.folder", json!({"owner": "alice", "path": "/"})).await;
    assert_eq!(root["id"], json!("alice_ROOT"));
    assert_eq!(root["root"], json!(true));
}

#[tokio::test]
async fn test_errors_carry_kind_and_status() {
    let (_dir, _fetcher, app) = app();

    let err = handle_method(&app, "bookmarks.get", &json!({"owner": "alice", "id": "missing"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.to_json()["status"], json!(404));

    let err = handle_method(&app, "bookmarks.get", &json!({"id": "x"})).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = handle_method(
        &app,
        "bookmarks.sort_order",
        &json!({"owner": "alice", "ids": ["a"], "orders": [1, 2]}),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_json()["kind"], json!("validation"));

    let err = handle_method(&app, "bookmarks.nope", &json!({})).await.unwrap_err();
    assert!(err.message.contains("unknown method"));
}

#[tokio::test]
async fn test_fetch_and_forward_and_most_recent() {
    let (_dir, _fetcher, app) = app();
    let created = call(
        &app,
        "bookmarks.create",
        json!({"owner": "alice", "bookmark": {"path": "/", "display_name": "Go", "url": "https://go.dev", "highlight": 1}}),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let forwarded = call(&app, "bookmarks.fetch_and_forward", json!({"owner": "alice", "id": id})).await;
    assert_eq!(forwarded["url"], json!("https://go.dev"));

    let recent = call(&app, "bookmarks.most_recent", json!({"owner": "alice"})).await;
    assert_eq!(recent[0]["id"], json!(id));
    assert_eq!(recent[0]["highlight"], json!(0));
}

#[tokio::test]
async fn test_stage_and_assign_favicon() {
    let (_dir, fetcher, app) = app();
    fetcher.image("https://img.example/logo.png", "image/png", png_bytes(64, 64));

    let staged = call(&app, "favicons.stage_from_url", json!({"url": "https://img.example/logo.png"})).await;
    let staged_id = staged["name"].as_str().unwrap().to_string();
    let payload = base64_decode(staged["payload"].as_str().unwrap()).unwrap();
    let img = image::load_from_memory(&payload).unwrap();
    assert_eq!(img.width(), 50);

    let read_back = call(&app, "favicons.staged", json!({"id": staged_id})).await;
    assert_eq!(read_back["payload"], staged["payload"]);

    let created = call(
        &app,
        "bookmarks.create",
        json!({"owner": "alice", "bookmark": {
            "path": "/", "display_name": "Img", "url": "https://img.example", "favicon": staged_id
        }}),
    )
    .await;

    let icon = call(&app, "favicons.bookmark", json!({"owner": "alice", "id": created["id"]})).await;
    assert_eq!(icon["name"], json!(staged_id));

    let available = call(&app, "favicons.available", json!({"owner": "alice"})).await;
    assert_eq!(available, json!([{"name": staged_id, "modified": icon["modified"]}]));

    let err = handle_method(&app, "favicons.staged", &json!({"id": staged_id})).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_stage_from_url_rejects_non_image() {
    let (_dir, fetcher, app) = app();
    fetcher.image("https://img.example/blob", "application/octet-stream", vec![1, 2, 3]);

    let err = handle_method(&app, "favicons.stage_from_url", &json!({"url": "https://img.example/blob"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Server);
}

#[tokio::test]
async fn test_upload_stages_resized_favicon() {
    let (_dir, _fetcher, app) = app();
    let staged = call(
        &app,
        "favicons.upload",
        json!({"name": "logo.png", "mime_type": "image/png", "payload": base64_encode(&png_bytes(100, 100))}),
    )
    .await;

    let payload = base64_decode(staged["payload"].as_str().unwrap()).unwrap();
    let img = image::load_from_memory(&payload).unwrap();
    assert_eq!((img.width(), img.height()), (50, 50));

    let err = handle_method(&app, "favicons.upload", &json!({"name": "logo.png", "payload": "***"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_settings_are_persisted_through_engine() {
    let (dir, _fetcher, app) = app();
    let config = dir.path().join("bookmarks.json");
    let mut engine = SettingsEngine::new(Some(config.to_string_lossy().to_string()));
    engine.load().unwrap();
    let app = app.with_settings_engine(engine);

    let result = call(&app, "settings.set", json!({"key": "favicon.width", "value": 32})).await;
    assert_eq!(result["restart_required"], json!(true));
    let current = call(&app, "settings.get", json!({})).await;
    assert_eq!(current["favicon"]["width"], json!(32));

    let mut reloaded = SettingsEngine::new(Some(config.to_string_lossy().to_string()));
    assert_eq!(reloaded.load().unwrap().favicon.width, 32);

    let err = handle_method(&app, "settings.set", &json!({"key": "favicon.nope", "value": 1}))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    call(&app, "settings.reset", json!({})).await;
    let current = call(&app, "settings.get", json!({})).await;
    assert_eq!(current["favicon"]["width"], json!(AppSettings::default().favicon.width));
}

#[tokio::test]
async fn test_settings_without_engine_are_read_only() {
    let (_dir, _fetcher, app) = app();
    let current = call(&app, "settings.get", json!({})).await;
    assert_eq!(current["favicon"]["background_refresh"], json!(false));

    let err = handle_method(&app, "settings.reset", &json!({})).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Server);
}

#[test]
fn test_rate_limited_requests_get_their_own_status() {
    let mut limiter = RateLimiter::new(2);
    assert!(limiter.check());
    assert!(limiter.check());
    assert!(!limiter.check());

    let reply = RpcError::rate_limited().to_json();
    assert_eq!(reply["kind"], json!("rate_limited"));
    assert_eq!(reply["status"], json!(429));
}
