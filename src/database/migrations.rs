//! Schema migrations for the bookmark database.
//!
//! Uses a `schema_version` table to track which migrations have been applied.
//! Each migration runs exactly once and is recorded with a timestamp.

use rusqlite::Connection;

/// Current schema version. Bump this when adding a new migration.
pub const CURRENT_SCHEMA_VERSION: i32 = 3;

/// Returns the current schema version from the database (0 if table doesn't exist).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .unwrap_or(0)
}

/// Runs all pending schema migrations against the provided connection.
///
/// Safe to call on every startup.
pub fn run_all(conn: &Connection) -> Result<(), rusqlite::Error> {
    // In-memory databases ignore WAL and keep their default journal mode.
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT NOT NULL
         );",
    )?;

    let current = get_schema_version(conn);

    if current < 1 {
        migration_v1(conn)?;
        record_version(conn, 1, "Initial schema: bookmarks and favicons")?;
    }

    if current < 2 {
        migration_v2(conn)?;
        record_version(conn, 2, "Index favicon references")?;
    }

    if current < 3 {
        migration_v3(conn)?;
        record_version(conn, 3, "Per-bookmark favicon color inversion")?;
    }

    Ok(())
}

fn record_version(conn: &Connection, version: i32, description: &str) -> Result<(), rusqlite::Error> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        rusqlite::params![version, now, description],
    )?;
    Ok(())
}

/// V1: bookmark rows keyed by owner and path, durable favicon payloads.
fn migration_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS bookmarks (
            id TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            path TEXT NOT NULL,
            display_name TEXT NOT NULL,
            url TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0,
            kind INTEGER NOT NULL DEFAULT 0,
            child_count INTEGER NOT NULL DEFAULT 0,
            highlight INTEGER NOT NULL DEFAULT 0,
            access_count INTEGER NOT NULL DEFAULT 0,
            favicon TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            modified_at INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_bookmarks_owner_path ON bookmarks(owner, path);
        CREATE INDEX IF NOT EXISTS idx_bookmarks_owner_name ON bookmarks(owner, display_name);

        CREATE TABLE IF NOT EXISTS favicons (
            id TEXT PRIMARY KEY,
            payload BLOB NOT NULL,
            last_modified INTEGER NOT NULL
        );
        ",
    )
}

/// V2: favicon reference lookups run on every delete.
fn migration_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch("CREATE INDEX IF NOT EXISTS idx_bookmarks_favicon ON bookmarks(favicon);")
}

/// V3: display flag for favicons that need inverted colors.
fn migration_v3(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "ALTER TABLE bookmarks ADD COLUMN invert_favicon_color INTEGER NOT NULL DEFAULT 0;",
    )
}
