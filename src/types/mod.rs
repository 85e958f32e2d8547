// Shared type definitions
// Each submodule defines types used across the application.

pub mod bookmark;
pub mod errors;
pub mod favicon;
pub mod settings;

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current UNIX timestamp in seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
