use crate::types::bookmark::{BookmarkNode, NodeCount};
use crate::types::errors::StoreError;
use crate::types::favicon::FaviconArtifact;

/// Storage operations on bookmark rows.
///
/// Implemented both by the repository itself (each call runs on its own) and
/// by the transactional handle passed into [`BookmarkRepository::in_unit_of_work`].
pub trait BookmarkStore {
    // ── Mutations ──────────────────────────────────────────────────

    /// Insert a new row. The node must already carry its ID.
    fn create(&self, node: &BookmarkNode) -> Result<BookmarkNode, StoreError>;

    /// Overwrite an existing row, matched by ID and owner.
    fn update(&self, node: &BookmarkNode) -> Result<BookmarkNode, StoreError>;

    fn delete(&self, id: &str, owner: &str) -> Result<(), StoreError>;

    // ── Lookups ────────────────────────────────────────────────────

    /// Fails with `StoreError::NotFound` when the row does not exist.
    fn get_by_id(&self, id: &str, owner: &str) -> Result<BookmarkNode, StoreError>;

    /// Rows whose path equals `path` exactly.
    fn get_by_path(&self, path: &str, owner: &str) -> Result<Vec<BookmarkNode>, StoreError>;

    /// Rows whose path equals `prefix` or lies below it, at any depth.
    fn get_by_path_prefix(&self, prefix: &str, owner: &str) -> Result<Vec<BookmarkNode>, StoreError>;

    /// Case-insensitive substring search on the display name.
    fn get_by_name(&self, name: &str, owner: &str) -> Result<Vec<BookmarkNode>, StoreError>;

    /// Visited nodes, most visited first.
    fn get_most_recent(&self, owner: &str, limit: u32) -> Result<Vec<BookmarkNode>, StoreError>;

    /// Row counts grouped by path, restricted to `path`.
    fn get_child_count(&self, path: &str, owner: &str) -> Result<Vec<NodeCount>, StoreError>;

    /// Every folder full-path of the owner, including the root.
    fn get_all_paths(&self, owner: &str) -> Result<Vec<String>, StoreError>;

    /// The folder whose full-path equals `path`.
    fn get_folder_by_path(&self, path: &str, owner: &str) -> Result<BookmarkNode, StoreError>;

    fn get_all(&self, owner: &str) -> Result<Vec<BookmarkNode>, StoreError>;

    /// Number of rows, across all owners, that reference the durable favicon.
    fn count_favicon_references(&self, favicon_id: &str) -> Result<i64, StoreError>;
}

/// The bookmark repository: plain store operations plus an atomic boundary.
pub trait BookmarkRepository: BookmarkStore + Send + Sync {
    /// Runs `work` against a transactional handle.
    ///
    /// An `Err` returned by `work` rolls back every mutation made through the
    /// handle; `Ok` commits them. The handle offers no way to open a nested
    /// unit of work.
    fn in_unit_of_work<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn BookmarkStore) -> Result<T, E>,
        E: From<StoreError>;

    /// Verifies that the underlying store answers queries.
    fn ping(&self) -> Result<(), StoreError>;
}

/// Durable favicon storage keyed by content ID.
pub trait FaviconRepository: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<FaviconArtifact>, StoreError>;

    /// Insert or replace the artifact.
    fn save(&self, artifact: &FaviconArtifact) -> Result<(), StoreError>;

    /// Returns `false` when nothing was stored under `id`.
    fn delete(&self, id: &str) -> Result<bool, StoreError>;
}
