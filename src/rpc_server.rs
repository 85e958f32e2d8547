//! Bookmarks RPC Server: JSON-RPC over stdin/stdout.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"bookmarks.create", "params":{"owner":"...","bookmark":{...}}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":{"kind":"...","status":400,"message":"..."}}
//!
//! Logs go to stderr; stdout carries protocol messages only.

use std::io::Write;
use std::path::PathBuf;

use bookmarks::app::App;
use bookmarks::rpc_handler::{handle_method, RateLimiter, RpcError};
use bookmarks::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use bookmarks::types::settings::AppSettings;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn emit(message: &Value) {
    let mut stdout = std::io::stdout().lock();
    if writeln!(stdout, "{}", message).and_then(|_| stdout.flush()).is_err() {
        error!("could not write response to stdout");
    }
}

fn load_settings() -> (SettingsEngine, AppSettings) {
    let config_path = std::env::var("BOOKMARKS_CONFIG").ok();
    let mut engine = SettingsEngine::new(config_path);
    let settings = match engine.load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("failed to load settings from {}: {}", engine.get_config_path(), e);
            AppSettings::default()
        }
    };
    (engine, settings)
}

fn init_tracing(settings: &AppSettings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let (engine, settings) = load_settings();
    init_tracing(&settings);

    let data_dir = std::env::var("BOOKMARKS_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    let app = match App::new(settings, &data_dir) {
        Ok(app) => app.with_settings_engine(engine),
        Err(e) => {
            error!(data_dir = %data_dir.display(), error = %e, "failed to initialize bookmark service");
            std::process::exit(1);
        }
    };

    // Signal ready
    emit(&json!({"event":"ready","version":env!("CARGO_PKG_VERSION")}));

    let mut rate_limiter = RateLimiter::new(200);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() { continue; }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let err = RpcError::invalid_params(format!("parse error: {}", e));
                emit(&json!({"id": null, "error": err.to_json()}));
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            let err = RpcError::rate_limited();
            emit(&json!({"id": id, "error": err.to_json()}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let response = match handle_method(&app, method, &params).await {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err.to_json()}),
        };
        emit(&response);
    }

    let outcomes = app.shutdown().await;
    info!(favicon_tasks = outcomes.len(), "stdin closed, shutting down");
}
