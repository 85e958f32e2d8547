//! SQLite implementation of the repository port.
//!
//! All queries live on [`SqlBookmarks`], which borrows a `Connection`. The
//! repository borrows it from the locked database for single calls and from an
//! open transaction inside a unit of work, so both paths run the same SQL.

use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use super::traits::{BookmarkRepository, BookmarkStore, FaviconRepository};
use crate::database::Database;
use crate::types::bookmark::{join_path, BookmarkNode, NodeCount, NodeKind, ROOT_PATH};
use crate::types::errors::StoreError;
use crate::types::favicon::FaviconArtifact;

const BOOKMARK_COLUMNS: &str = "id, owner, path, display_name, kind, url, sort_order, \
     child_count, highlight, access_count, favicon, created_at, modified_at, invert_favicon_color";

// ── Bookmarks ──────────────────────────────────────────────────────

/// Bookmark repository over the shared [`Database`].
pub struct SqliteBookmarkStore {
    db: Arc<Database>,
}

impl SqliteBookmarkStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&SqlBookmarks<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self.db.connection()?;
        f(&SqlBookmarks { conn: &*conn })
    }
}

impl BookmarkRepository for SqliteBookmarkStore {
    fn in_unit_of_work<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn BookmarkStore) -> Result<T, E>,
        E: From<StoreError>,
    {
        let conn = self.db.connection()?;
        let tx = conn.unchecked_transaction().map_err(StoreError::from)?;
        let result = work(&SqlBookmarks { conn: &*tx });
        match result {
            Ok(value) => {
                tx.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(err) => {
                // Dropping the transaction would roll back as well, but an
                // explicit rollback surfaces failures in the log.
                if let Err(rollback) = tx.rollback() {
                    warn!(error = %rollback, "rollback of unit of work failed");
                } else {
                    debug!("unit of work rolled back");
                }
                Err(err)
            }
        }
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.with_conn(|s| {
            s.conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
    }
}

impl BookmarkStore for SqliteBookmarkStore {
    fn create(&self, node: &BookmarkNode) -> Result<BookmarkNode, StoreError> {
        self.with_conn(|s| s.create(node))
    }

    fn update(&self, node: &BookmarkNode) -> Result<BookmarkNode, StoreError> {
        self.with_conn(|s| s.update(node))
    }

    fn delete(&self, id: &str, owner: &str) -> Result<(), StoreError> {
        self.with_conn(|s| s.delete(id, owner))
    }

    fn get_by_id(&self, id: &str, owner: &str) -> Result<BookmarkNode, StoreError> {
        self.with_conn(|s| s.get_by_id(id, owner))
    }

    fn get_by_path(&self, path: &str, owner: &str) -> Result<Vec<BookmarkNode>, StoreError> {
        self.with_conn(|s| s.get_by_path(path, owner))
    }

    fn get_by_path_prefix(&self, prefix: &str, owner: &str) -> Result<Vec<BookmarkNode>, StoreError> {
        self.with_conn(|s| s.get_by_path_prefix(prefix, owner))
    }

    fn get_by_name(&self, name: &str, owner: &str) -> Result<Vec<BookmarkNode>, StoreError> {
        self.with_conn(|s| s.get_by_name(name, owner))
    }

    fn get_most_recent(&self, owner: &str, limit: u32) -> Result<Vec<BookmarkNode>, StoreError> {
        self.with_conn(|s| s.get_most_recent(owner, limit))
    }

    fn get_child_count(&self, path: &str, owner: &str) -> Result<Vec<NodeCount>, StoreError> {
        self.with_conn(|s| s.get_child_count(path, owner))
    }

    fn get_all_paths(&self, owner: &str) -> Result<Vec<String>, StoreError> {
        self.with_conn(|s| s.get_all_paths(owner))
    }

    fn get_folder_by_path(&self, path: &str, owner: &str) -> Result<BookmarkNode, StoreError> {
        self.with_conn(|s| s.get_folder_by_path(path, owner))
    }

    fn get_all(&self, owner: &str) -> Result<Vec<BookmarkNode>, StoreError> {
        self.with_conn(|s| s.get_all(owner))
    }

    fn count_favicon_references(&self, favicon_id: &str) -> Result<i64, StoreError> {
        self.with_conn(|s| s.count_favicon_references(favicon_id))
    }
}

/// Query set bound to a borrowed connection or transaction.
struct SqlBookmarks<'c> {
    conn: &'c Connection,
}

impl SqlBookmarks<'_> {
    fn row_to_node(row: &Row) -> rusqlite::Result<BookmarkNode> {
        let kind: i64 = row.get(4)?;
        let kind = NodeKind::from_i64(kind).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Integer,
                Box::new(StoreError::InvalidData(format!("unknown bookmark kind {}", kind))),
            )
        })?;
        Ok(BookmarkNode {
            id: row.get(0)?,
            owner: row.get(1)?,
            path: row.get(2)?,
            display_name: row.get(3)?,
            kind,
            url: row.get(5)?,
            sort_order: row.get(6)?,
            child_count: row.get(7)?,
            highlight: row.get(8)?,
            access_count: row.get(9)?,
            favicon: row.get(10)?,
            created_at: row.get(11)?,
            modified_at: row.get(12)?,
            invert_favicon_color: row.get(13)?,
        })
    }

    fn query_nodes(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<BookmarkNode>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::row_to_node)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

impl BookmarkStore for SqlBookmarks<'_> {
    fn create(&self, node: &BookmarkNode) -> Result<BookmarkNode, StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO bookmarks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                BOOKMARK_COLUMNS
            ),
            params![
                node.id,
                node.owner,
                node.path,
                node.display_name,
                node.kind.as_i64(),
                node.url,
                node.sort_order,
                node.child_count,
                node.highlight,
                node.access_count,
                node.favicon,
                node.created_at,
                node.modified_at,
                node.invert_favicon_color,
            ],
        )?;
        Ok(node.clone())
    }

    fn update(&self, node: &BookmarkNode) -> Result<BookmarkNode, StoreError> {
        let affected = self.conn.execute(
            "UPDATE bookmarks SET path = ?1, display_name = ?2, kind = ?3, url = ?4, \
             sort_order = ?5, child_count = ?6, highlight = ?7, access_count = ?8, \
             favicon = ?9, modified_at = ?10, invert_favicon_color = ?11 \
             WHERE id = ?12 AND owner = ?13",
            params![
                node.path,
                node.display_name,
                node.kind.as_i64(),
                node.url,
                node.sort_order,
                node.child_count,
                node.highlight,
                node.access_count,
                node.favicon,
                node.modified_at,
                node.invert_favicon_color,
                node.id,
                node.owner,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(node.id.clone()));
        }
        Ok(node.clone())
    }

    fn delete(&self, id: &str, owner: &str) -> Result<(), StoreError> {
        let affected = self.conn.execute(
            "DELETE FROM bookmarks WHERE id = ?1 AND owner = ?2",
            params![id, owner],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn get_by_id(&self, id: &str, owner: &str) -> Result<BookmarkNode, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM bookmarks WHERE id = ?1 AND owner = ?2", BOOKMARK_COLUMNS),
                params![id, owner],
                Self::row_to_node,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn get_by_path(&self, path: &str, owner: &str) -> Result<Vec<BookmarkNode>, StoreError> {
        self.query_nodes(
            &format!(
                "SELECT {} FROM bookmarks WHERE owner = ?1 AND path = ?2 \
                 ORDER BY sort_order, display_name",
                BOOKMARK_COLUMNS
            ),
            params![owner, path],
        )
    }

    fn get_by_path_prefix(&self, prefix: &str, owner: &str) -> Result<Vec<BookmarkNode>, StoreError> {
        if prefix == ROOT_PATH {
            return self.get_all(owner);
        }
        // A literal comparison on the leading characters, so '%' or '_' in
        // folder names never act as wildcards.
        let below = format!("{}/", prefix);
        self.query_nodes(
            &format!(
                "SELECT {} FROM bookmarks WHERE owner = ?1 \
                 AND (path = ?2 OR substr(path, 1, length(?3)) = ?3) \
                 ORDER BY path, sort_order",
                BOOKMARK_COLUMNS
            ),
            params![owner, prefix, below],
        )
    }

    fn get_by_name(&self, name: &str, owner: &str) -> Result<Vec<BookmarkNode>, StoreError> {
        let pattern = format!("%{}%", escape_like(name));
        self.query_nodes(
            &format!(
                "SELECT {} FROM bookmarks WHERE owner = ?1 AND display_name LIKE ?2 ESCAPE '\\' \
                 ORDER BY sort_order, display_name",
                BOOKMARK_COLUMNS
            ),
            params![owner, pattern],
        )
    }

    fn get_most_recent(&self, owner: &str, limit: u32) -> Result<Vec<BookmarkNode>, StoreError> {
        self.query_nodes(
            &format!(
                "SELECT {} FROM bookmarks WHERE owner = ?1 AND kind = ?2 AND access_count > 0 \
                 ORDER BY access_count DESC, display_name LIMIT ?3",
                BOOKMARK_COLUMNS
            ),
            params![owner, NodeKind::Node.as_i64(), limit],
        )
    }

    fn get_child_count(&self, path: &str, owner: &str) -> Result<Vec<NodeCount>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT path, COUNT(*) FROM bookmarks WHERE owner = ?1 AND path = ?2 GROUP BY path",
        )?;
        let rows = stmt.query_map(params![owner, path], |row| {
            Ok(NodeCount {
                path: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    fn get_all_paths(&self, owner: &str) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT path, display_name FROM bookmarks WHERE owner = ?1 AND kind = ?2",
        )?;
        let rows = stmt.query_map(params![owner, NodeKind::Folder.as_i64()], |row| {
            Ok(join_path(&row.get::<_, String>(0)?, &row.get::<_, String>(1)?))
        })?;
        let mut paths = vec![ROOT_PATH.to_string()];
        for row in rows {
            paths.push(row?);
        }
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    fn get_folder_by_path(&self, path: &str, owner: &str) -> Result<BookmarkNode, StoreError> {
        let (parent, name) = match path.rsplit_once('/') {
            Some(("", name)) => (ROOT_PATH, name),
            Some((parent, name)) => (parent, name),
            None => return Err(StoreError::NotFound(path.to_string())),
        };
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM bookmarks WHERE owner = ?1 AND path = ?2 \
                     AND display_name = ?3 AND kind = ?4 LIMIT 1",
                    BOOKMARK_COLUMNS
                ),
                params![owner, parent, name, NodeKind::Folder.as_i64()],
                Self::row_to_node,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    fn get_all(&self, owner: &str) -> Result<Vec<BookmarkNode>, StoreError> {
        self.query_nodes(
            &format!(
                "SELECT {} FROM bookmarks WHERE owner = ?1 ORDER BY path, sort_order",
                BOOKMARK_COLUMNS
            ),
            params![owner],
        )
    }

    fn count_favicon_references(&self, favicon_id: &str) -> Result<i64, StoreError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM bookmarks WHERE favicon = ?1",
            params![favicon_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ── Favicons ───────────────────────────────────────────────────────

/// Durable favicon store sharing the bookmark database.
pub struct SqliteFaviconStore {
    db: Arc<Database>,
}

impl SqliteFaviconStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl FaviconRepository for SqliteFaviconStore {
    fn get(&self, id: &str) -> Result<Option<FaviconArtifact>, StoreError> {
        let conn = self.db.connection()?;
        let artifact = conn
            .query_row(
                "SELECT id, payload, last_modified FROM favicons WHERE id = ?1",
                params![id],
                |row| {
                    Ok(FaviconArtifact {
                        id: row.get(0)?,
                        payload: row.get(1)?,
                        last_modified: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(artifact)
    }

    fn save(&self, artifact: &FaviconArtifact) -> Result<(), StoreError> {
        let conn = self.db.connection()?;
        conn.execute(
            "INSERT INTO favicons (id, payload, last_modified) VALUES (?1, ?2, ?3) \
             ON CONFLICT(id) DO UPDATE SET payload = excluded.payload, \
             last_modified = excluded.last_modified",
            params![artifact.id, artifact.payload, artifact.last_modified],
        )?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.db.connection()?;
        let affected = conn.execute("DELETE FROM favicons WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}
