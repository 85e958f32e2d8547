//! SQLite connection management.
//!
//! Provides the [`Database`] struct that owns a `rusqlite::Connection` behind a
//! mutex and runs schema migrations on open.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::info;

use super::migrations;
use crate::types::errors::StoreError;

/// Shared handle to the bookmark database.
///
/// The connection is serialized through a mutex, so one writer at a time
/// operates on it. Repositories clone an `Arc<Database>` and lock per call or
/// per unit of work.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens (or creates) a SQLite database at the given file path and runs migrations.
    ///
    /// # Errors
    /// Returns `StoreError::Sqlite` if the connection cannot be established or migrations fail.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        migrations::run_all(&conn)?;
        info!(path = %path.display(), "database opened");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Opens an in-memory SQLite database and runs migrations.
    ///
    /// Useful for testing; the data is discarded when the `Database` is dropped.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        migrations::run_all(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Locks and returns the underlying connection.
    pub fn connection(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}
