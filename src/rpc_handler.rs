//! RPC method handler for the bookmarks JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! The `handle_method` function dispatches JSON-RPC method calls to the
//! bookmark manager and settings engine held by [`App`]. Every bookmark method
//! is scoped to the `owner` parameter.

use std::sync::MutexGuard;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::app::App;
use crate::managers::bookmark_manager::BookmarkManagerTrait;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::bookmark::{BookmarkInput, BookmarkNode, SortOrderBatch};
use crate::types::errors::{BookmarkError, ErrorKind, SettingsError};
use crate::types::favicon::ObjectInfo;

/// Encode bytes to base64 string.
pub fn base64_encode(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Decode base64 string to bytes.
pub fn base64_decode(input: &str) -> Result<Vec<u8>, String> {
    BASE64.decode(input).map_err(|e| format!("base64 decode error: {}", e))
}

/// Simple rate limiter: max requests per second.
pub struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    pub fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    pub fn check(&mut self) -> bool {
        let elapsed = self.window_start.elapsed();
        if elapsed.as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

/// Error reply of a failed call, carrying the kind a caller maps to a status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RpcError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
        }
    }

    pub fn rate_limited() -> Self {
        Self {
            kind: ErrorKind::RateLimited,
            message: "rate limit exceeded".to_string(),
        }
    }

    fn server(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Server,
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "kind": self.kind.as_str(),
            "status": self.kind.status_code(),
            "message": self.message,
        })
    }
}

impl From<BookmarkError> for RpcError {
    fn from(err: BookmarkError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<SettingsError> for RpcError {
    fn from(err: SettingsError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

fn str_param<'a>(params: &'a Value, name: &str) -> Result<&'a str, RpcError> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(format!("missing {}", name)))
}

fn opt_str_param<'a>(params: &'a Value, name: &str) -> &'a str {
    params.get(name).and_then(|v| v.as_str()).unwrap_or("")
}

fn typed_param<T: DeserializeOwned>(params: &Value, name: &str) -> Result<T, RpcError> {
    let value = params
        .get(name)
        .cloned()
        .ok_or_else(|| RpcError::invalid_params(format!("missing {}", name)))?;
    serde_json::from_value(value).map_err(|e| RpcError::invalid_params(format!("invalid {}: {}", name, e)))
}

fn node_json(node: &BookmarkNode) -> Result<Value, RpcError> {
    serde_json::to_value(node).map_err(|e| RpcError::server(e.to_string()))
}

fn nodes_json(nodes: &[BookmarkNode]) -> Result<Value, RpcError> {
    nodes.iter().map(node_json).collect::<Result<Vec<_>, _>>().map(Value::Array)
}

fn object_json(info: &ObjectInfo) -> Value {
    let mut obj = json!({"name": info.name, "modified": info.modified});
    if !info.payload.is_empty() {
        obj["payload"] = json!(base64_encode(&info.payload));
    }
    obj
}

fn settings_engine(app: &App) -> Result<MutexGuard<'_, SettingsEngine>, RpcError> {
    app.settings_engine
        .as_ref()
        .ok_or_else(|| RpcError::server("no settings file attached"))?
        .lock()
        .map_err(|_| RpcError::server("settings lock poisoned"))
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or an [`RpcError`] whose kind tells
/// validation, not-found and server failures apart.
pub async fn handle_method(app: &App, method: &str, params: &Value) -> Result<Value, RpcError> {
    let bookmarks = &app.bookmarks;
    match method {
        "ping" => {
            bookmarks.check_store()?;
            Ok(json!({"ok": true, "version": env!("CARGO_PKG_VERSION")}))
        }

        // ─── Bookmarks ───
        "bookmarks.create" => {
            let owner = str_param(params, "owner")?;
            let input: BookmarkInput = typed_param(params, "bookmark")?;
            let node = bookmarks.create_bookmark(input, owner)?;
            node_json(&node)
        }
        "bookmarks.update" => {
            let owner = str_param(params, "owner")?;
            let input: BookmarkInput = typed_param(params, "bookmark")?;
            let node = bookmarks.update_bookmark(input, owner)?;
            node_json(&node)
        }
        "bookmarks.delete" => {
            let owner = str_param(params, "owner")?;
            let id = str_param(params, "id")?;
            bookmarks.delete(id, owner)?;
            Ok(json!({"ok": true}))
        }
        "bookmarks.sort_order" => {
            let owner = str_param(params, "owner")?;
            let batch = SortOrderBatch {
                ids: typed_param(params, "ids")?,
                orders: typed_param(params, "orders")?,
            };
            let updated = bookmarks.update_sort_order(&batch, owner)?;
            Ok(json!({"updated": updated}))
        }
        "bookmarks.get" => {
            let owner = str_param(params, "owner")?;
            let id = str_param(params, "id")?;
            node_json(&bookmarks.get_bookmark_by_id(id, owner)?)
        }
        "bookmarks.by_path" => {
            let owner = str_param(params, "owner")?;
            let path = str_param(params, "path")?;
            nodes_json(&bookmarks.get_bookmarks_by_path(path, owner)?)
        }
        "bookmarks.folder" => {
            let owner = str_param(params, "owner")?;
            let path = str_param(params, "path")?;
            let folder = bookmarks.get_folder_by_path(path, owner)?;
            let is_root = folder.is_root();
            let mut value = node_json(&folder.into_node())?;
            value["root"] = json!(is_root);
            Ok(value)
        }
        "bookmarks.by_name" => {
            let owner = str_param(params, "owner")?;
            let name = str_param(params, "name")?;
            nodes_json(&bookmarks.get_bookmarks_by_name(name, owner)?)
        }
        "bookmarks.most_recent" => {
            let owner = str_param(params, "owner")?;
            nodes_json(&bookmarks.get_most_recent(owner)?)
        }
        "bookmarks.paths" => {
            let owner = str_param(params, "owner")?;
            Ok(json!(bookmarks.get_all_paths(owner)?))
        }
        "bookmarks.fetch_and_forward" => {
            let owner = str_param(params, "owner")?;
            let id = str_param(params, "id")?;
            let url = bookmarks.fetch_and_forward(id, owner)?;
            Ok(json!({"url": url}))
        }

        // ─── Favicons ───
        "favicons.bookmark" => {
            let owner = str_param(params, "owner")?;
            let id = str_param(params, "id")?;
            Ok(object_json(&bookmarks.get_bookmark_favicon(id, owner)?))
        }
        "favicons.get" => {
            let id = str_param(params, "id")?;
            Ok(object_json(&bookmarks.get_favicon_by_id(id)?))
        }
        "favicons.available" => {
            let owner = str_param(params, "owner")?;
            let search = opt_str_param(params, "search");
            let favicons = bookmarks.get_available_favicons(owner, search)?;
            Ok(Value::Array(favicons.iter().map(object_json).collect()))
        }
        "favicons.stage_from_page" => {
            let url = str_param(params, "url")?;
            Ok(object_json(&bookmarks.stage_favicon_from_page(url).await?))
        }
        "favicons.stage_from_url" => {
            let url = str_param(params, "url")?;
            Ok(object_json(&bookmarks.stage_favicon_from_image_url(url).await?))
        }
        "favicons.staged" => {
            let id = str_param(params, "id")?;
            Ok(object_json(&bookmarks.read_staged_favicon(id)?))
        }
        "favicons.upload" => {
            let name = str_param(params, "name")?;
            let mime_type = opt_str_param(params, "mime_type");
            let payload = base64_decode(str_param(params, "payload")?).map_err(RpcError::invalid_params)?;
            Ok(object_json(&bookmarks.stage_favicon_upload(name, mime_type, payload)?))
        }

        // ─── Settings ───
        "settings.get" => {
            let settings = match app.settings_engine {
                Some(_) => settings_engine(app)?.get_settings().clone(),
                None => app.settings.clone(),
            };
            serde_json::to_value(settings).map_err(|e| RpcError::server(e.to_string()))
        }
        "settings.set" => {
            let key = str_param(params, "key")?;
            let value = params
                .get("value")
                .cloned()
                .ok_or_else(|| RpcError::invalid_params("missing value"))?;
            settings_engine(app)?.set_value(key, value)?;
            Ok(json!({"ok": true, "restart_required": true}))
        }
        "settings.reset" => {
            settings_engine(app)?.reset()?;
            Ok(json!({"ok": true, "restart_required": true}))
        }

        _ => Err(RpcError {
            kind: ErrorKind::NotFound,
            message: format!("unknown method: {}", method),
        }),
    }
}
