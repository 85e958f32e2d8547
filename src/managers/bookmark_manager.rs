//! Bookmark tree service.
//!
//! Implements `BookmarkManagerTrait`: CRUD over path-addressed bookmarks and
//! folders, backed by a [`BookmarkRepository`]. Folders are not linked by ID;
//! a folder's children carry its full-path in their `path` column, so renames
//! and moves rewrite the paths of the whole subtree and child counts are
//! recomputed from the rows. Every multi-step mutation runs inside exactly one
//! unit of work.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::services::favicon_service::{is_staged_reference, FaviconService};
use crate::services::favicon_tasks::FaviconTasks;
use crate::store::{BookmarkRepository, BookmarkStore};
use crate::types::bookmark::{
    is_within, join_path, normalize_path, rebase_path, BookmarkInput, BookmarkNode, FolderView,
    NodeKind, SortOrderBatch, ROOT_PATH,
};
use crate::types::errors::{BookmarkError, StoreError};
use crate::types::favicon::ObjectInfo;
use crate::types::unix_now;

/// Name reported for the built-in icons.
pub const DEFAULT_ICON_NAME: &str = "default_bookmark_favicon.svg";

/// Modification time reported for the built-in icons (2022-12-31T00:00:00Z).
const DEFAULT_ICON_MODIFIED: i64 = 1_672_444_800;

static DEFAULT_NODE_ICON: &[u8] = include_bytes!("../../assets/default_bookmark_favicon.svg");
static DEFAULT_FOLDER_ICON: &[u8] = include_bytes!("../../assets/default_folder_favicon.svg");

/// Default upper bound of the most-recent projection.
pub const DEFAULT_MOST_RECENT_LIMIT: u32 = 100;

/// Trait defining bookmark tree operations. Every call is scoped to `owner`.
pub trait BookmarkManagerTrait {
    fn create_bookmark(&self, input: BookmarkInput, owner: &str) -> Result<BookmarkNode, BookmarkError>;
    fn update_bookmark(&self, input: BookmarkInput, owner: &str) -> Result<BookmarkNode, BookmarkError>;
    fn delete(&self, id: &str, owner: &str) -> Result<(), BookmarkError>;
    /// All-or-nothing: the first unknown ID rolls back the whole batch.
    fn update_sort_order(&self, batch: &SortOrderBatch, owner: &str) -> Result<usize, BookmarkError>;
    /// Marks a node as seen and returns its URL.
    fn fetch_and_forward(&self, id: &str, owner: &str) -> Result<String, BookmarkError>;

    fn get_bookmark_by_id(&self, id: &str, owner: &str) -> Result<BookmarkNode, BookmarkError>;
    fn get_folder_by_path(&self, path: &str, owner: &str) -> Result<FolderView, BookmarkError>;

    // Read projections: storage failures are logged and yield an empty result.
    fn get_bookmarks_by_path(&self, path: &str, owner: &str) -> Result<Vec<BookmarkNode>, BookmarkError>;
    fn get_bookmarks_by_name(&self, name: &str, owner: &str) -> Result<Vec<BookmarkNode>, BookmarkError>;
    fn get_most_recent(&self, owner: &str) -> Result<Vec<BookmarkNode>, BookmarkError>;
    fn get_all_paths(&self, owner: &str) -> Result<Vec<String>, BookmarkError>;

    fn get_bookmark_favicon(&self, id: &str, owner: &str) -> Result<ObjectInfo, BookmarkError>;
    fn get_favicon_by_id(&self, favicon_id: &str) -> Result<ObjectInfo, BookmarkError>;
    fn get_available_favicons(&self, owner: &str, search: &str) -> Result<Vec<ObjectInfo>, BookmarkError>;
}

/// Bookmark service over a repository and the favicon service.
///
/// Holds no bookmark state of its own; every call consults the repository.
pub struct BookmarkManager<R> {
    repo: Arc<R>,
    favicons: Arc<FaviconService>,
    tasks: Option<Arc<FaviconTasks<R>>>,
    most_recent_limit: u32,
}

impl<R: BookmarkRepository + 'static> BookmarkManager<R> {
    pub fn new(repo: Arc<R>, favicons: Arc<FaviconService>) -> Self {
        Self {
            repo,
            favicons,
            tasks: None,
            most_recent_limit: DEFAULT_MOST_RECENT_LIMIT,
        }
    }

    /// Enables background favicon fetching for nodes saved without a favicon.
    pub fn with_background_refresh(mut self, tasks: Arc<FaviconTasks<R>>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn with_most_recent_limit(mut self, limit: u32) -> Self {
        self.most_recent_limit = limit;
        self
    }

    pub fn favicon_tasks(&self) -> Option<&Arc<FaviconTasks<R>>> {
        self.tasks.as_ref()
    }

    /// Checks that the repository answers queries.
    pub fn check_store(&self) -> Result<(), BookmarkError> {
        self.repo
            .ping()
            .map_err(|e| BookmarkError::server("bookmark store is not reachable", e))
    }

    /// Discovers the favicon of the page at `url` and stages it for a later create/update.
    pub async fn stage_favicon_from_page(&self, url: &str) -> Result<ObjectInfo, BookmarkError> {
        require(url, "url")?;
        self.favicons.stage_from_page(url).await.map_err(|e| {
            error!(url, error = %e, "could not stage favicon from page");
            BookmarkError::from(e).with_context(format!("cannot fetch favicon from '{}'", url))
        })
    }

    /// Fetches an image directly from `url` and stages it.
    pub async fn stage_favicon_from_image_url(&self, url: &str) -> Result<ObjectInfo, BookmarkError> {
        require(url, "url")?;
        self.favicons.stage_from_image_url(url).await.map_err(|e| {
            error!(url, error = %e, "could not stage favicon image");
            BookmarkError::from(e).with_context(format!("cannot fetch favicon from '{}'", url))
        })
    }

    pub fn read_staged_favicon(&self, id: &str) -> Result<ObjectInfo, BookmarkError> {
        require(id, "id")?;
        self.favicons
            .read_staged(id)
            .map_err(|e| BookmarkError::from(e).with_context(format!("cannot read staged favicon '{}'", id)))
    }

    /// Stages a favicon uploaded by the client, resized like fetched ones.
    pub fn stage_favicon_upload(
        &self,
        name: &str,
        mime_type: &str,
        payload: Vec<u8>,
    ) -> Result<ObjectInfo, BookmarkError> {
        require(name, "name")?;
        if payload.is_empty() {
            return Err(BookmarkError::validation("favicon upload has no content"));
        }
        self.favicons.stage_upload(name, mime_type, payload).map_err(|e| {
            error!(name, error = %e, "could not stage uploaded favicon");
            BookmarkError::from(e).with_context(format!("cannot stage favicon '{}'", name))
        })
    }

    /// Copies a staged favicon into the durable store. The staging copy stays
    /// until [`Self::settle_favicon`] runs after the unit of work.
    fn promote_favicon(&self, reference: &str) -> Result<String, BookmarkError> {
        self.favicons.promote(reference).map_err(|e| {
            error!(favicon = reference, error = %e, "could not store the specified favicon");
            BookmarkError::server(format!("could not store favicon '{}'", reference), e)
        })
    }

    /// Completes a promotion once the unit of work has ended. A commit drops
    /// the staging copy; a rollback drops the durable copy unless another
    /// bookmark references it, leaving the staged favicon usable for a retry.
    fn settle_favicon(&self, reference: &str, promoted: &str, committed: bool) {
        if !is_staged_reference(reference) {
            return;
        }
        if committed {
            self.favicons.discard_staged(reference);
        } else {
            self.release_favicon(promoted);
        }
    }

    /// Deletes a durable favicon once no bookmark references it any more.
    fn release_favicon(&self, favicon: &str) {
        match self.repo.count_favicon_references(favicon) {
            Ok(0) => match self.favicons.release(favicon) {
                Ok(true) => info!(favicon, "released unreferenced favicon"),
                Ok(false) => warn!(favicon, "favicon was not available in the store"),
                Err(e) => warn!(favicon, error = %e, "could not delete favicon"),
            },
            Ok(n) => debug!(favicon, references = n, "favicon still referenced"),
            Err(e) => warn!(favicon, error = %e, "could not count favicon references"),
        }
    }

    fn schedule_refresh(&self, node: &BookmarkNode) {
        if node.kind != NodeKind::Node || !node.favicon.is_empty() {
            return;
        }
        if let (Some(tasks), Some(url)) = (&self.tasks, node.url.as_deref()) {
            tasks.schedule(&node.owner, &node.id, url);
        }
    }
}

impl<R: BookmarkRepository + 'static> BookmarkManagerTrait for BookmarkManager<R> {
    /// Creates a bookmark or folder below an existing folder (or the root).
    ///
    /// The parent and folder uniqueness are checked before a staged favicon
    /// is promoted. The staging copy is only removed after the commit, so a
    /// failed create can be retried with the same favicon.
    fn create_bookmark(&self, input: BookmarkInput, owner: &str) -> Result<BookmarkNode, BookmarkError> {
        require(owner, "owner")?;
        let path = validated_path(&input.path)?;
        let display_name = validated_name(&input.display_name)?;
        let kind = input.kind.unwrap_or(NodeKind::Node);
        let url = validated_url(kind, input.url.as_deref())?;

        let mut node = BookmarkNode {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            path,
            display_name,
            kind,
            url,
            sort_order: input.sort_order,
            child_count: 0,
            highlight: input.highlight.clamp(0, 1),
            access_count: 0,
            favicon: String::new(),
            invert_favicon_color: input.invert_favicon_color,
            created_at: unix_now(),
            modified_at: None,
        };

        check_placement(self.repo.as_ref(), &node, owner)?;

        if !input.favicon.is_empty() {
            node.favicon = self.promote_favicon(&input.favicon)?;
        }

        let result = self
            .repo
            .in_unit_of_work(|store| -> Result<BookmarkNode, BookmarkError> {
                check_placement(store, &node, owner)?;
                let created = store.create(&node)?;
                update_child_count(store, &node.path, owner)?;
                Ok(created)
            })
            .map_err(|e| {
                error!(owner, path = %node.path, error = %e, "could not create a new bookmark");
                e.with_context("error creating a new bookmark")
            });
        if !node.favicon.is_empty() {
            self.settle_favicon(&input.favicon, &node.favicon, result.is_ok());
        }
        let created = result?;

        info!(owner, id = %created.id, path = %created.path, "bookmark created");
        self.schedule_refresh(&created);
        Ok(created)
    }

    /// Updates name, location, URL, sort order, highlight and favicon.
    ///
    /// The kind of an entry never changes. Renaming or moving a folder
    /// rewrites the path of every descendant, and a changed path recomputes
    /// the child count of both the old and the new parent.
    fn update_bookmark(&self, input: BookmarkInput, owner: &str) -> Result<BookmarkNode, BookmarkError> {
        require(owner, "owner")?;
        require(&input.id, "id")?;
        let path = validated_path(&input.path)?;
        let display_name = validated_name(&input.display_name)?;

        let existing = self.repo.get_by_id(&input.id, owner).map_err(|e| {
            error!(owner, id = %input.id, error = %e, "could not find bookmark");
            BookmarkError::from(e)
        })?;
        check_relocation(self.repo.as_ref(), &existing, &path, &display_name, owner)?;
        let url = validated_url(existing.kind, input.url.as_deref())?;

        let promoted = !input.favicon.is_empty() && input.favicon != existing.favicon;
        let favicon = if promoted {
            self.promote_favicon(&input.favicon)?
        } else {
            existing.favicon.clone()
        };

        let highlight = input.highlight.clamp(0, 1);
        let result = self
            .repo
            .in_unit_of_work(|store| -> Result<BookmarkNode, BookmarkError> {
                let existing = store.get_by_id(&input.id, owner)?;
                check_relocation(store, &existing, &path, &display_name, owner)?;

                let old_full_path = existing.full_path();
                let path_changed = existing.path != path;
                let renamed = existing.display_name != display_name;

                let mut child_count = existing.child_count;
                if existing.is_folder() {
                    child_count = child_count_of(store, &old_full_path, owner)?;
                }

                let node = BookmarkNode {
                    path: path.clone(),
                    display_name,
                    url,
                    sort_order: input.sort_order,
                    child_count,
                    highlight,
                    favicon: favicon.clone(),
                    invert_favicon_color: input.invert_favicon_color,
                    modified_at: Some(unix_now()),
                    ..existing.clone()
                };
                store.update(&node)?;

                if existing.is_folder() && (path_changed || renamed) {
                    let new_full_path = node.full_path();
                    rewrite_subtree(store, &old_full_path, &new_full_path, owner)?;
                    update_child_count(store, &new_full_path, owner)?;
                }
                if path_changed {
                    update_child_count(store, &existing.path, owner)?;
                    update_child_count(store, &path, owner)?;
                }

                Ok(store.get_by_id(&existing.id, owner)?)
            })
            .map_err(|e| {
                error!(owner, id = %input.id, error = %e, "could not update bookmark");
                e.with_context("error updating bookmark")
            });
        if promoted {
            self.settle_favicon(&input.favicon, &favicon, result.is_ok());
        }
        let updated = result?;

        info!(owner, id = %updated.id, "bookmark updated");
        self.schedule_refresh(&updated);
        Ok(updated)
    }

    /// Deletes a bookmark or an empty folder.
    ///
    /// Folders with children are refused; there is no cascading delete. A
    /// favicon no other bookmark references is removed after the commit.
    fn delete(&self, id: &str, owner: &str) -> Result<(), BookmarkError> {
        require(owner, "owner")?;
        require(id, "id")?;

        info!(owner, id, "will try to delete bookmark");
        let favicon = self
            .repo
            .in_unit_of_work(|store| -> Result<String, BookmarkError> {
                let existing = store.get_by_id(id, owner)?;
                if existing.is_folder() {
                    let full_path = existing.full_path();
                    let children = child_count_of(store, &full_path, owner)?;
                    if children > 0 {
                        return Err(BookmarkError::validation(format!(
                            "cannot delete folder '{}' because of existing child-elements {}",
                            full_path, children
                        )));
                    }
                }
                store.delete(id, owner)?;
                update_child_count(store, &existing.path, owner)?;
                Ok(existing.favicon)
            })
            .map_err(|e| {
                error!(owner, id, error = %e, "could not delete bookmark");
                e.with_context("error deleting bookmark")
            })?;

        if !favicon.is_empty() {
            self.release_favicon(&favicon);
        }
        Ok(())
    }

    fn update_sort_order(&self, batch: &SortOrderBatch, owner: &str) -> Result<usize, BookmarkError> {
        require(owner, "owner")?;
        if batch.ids.len() != batch.orders.len() {
            return Err(BookmarkError::validation(format!(
                "the number of IDs ({}) does not correspond the number of sort-order entries ({})",
                batch.ids.len(),
                batch.orders.len()
            )));
        }
        if batch.ids.is_empty() {
            return Ok(0);
        }

        self.repo
            .in_unit_of_work(|store| -> Result<usize, BookmarkError> {
                let now = unix_now();
                let mut applied = 0;
                for (id, order) in batch.ids.iter().zip(&batch.orders) {
                    let mut node = store.get_by_id(id, owner)?;
                    debug!(id = %id, sort_order = order, "update sort order");
                    node.sort_order = *order;
                    node.modified_at = Some(now);
                    store.update(&node)?;
                    applied += 1;
                }
                Ok(applied)
            })
            .map_err(|e| {
                error!(owner, error = %e, "could not update the sort-order");
                e.with_context("error updating sort-order of bookmarks")
            })
    }

    fn fetch_and_forward(&self, id: &str, owner: &str) -> Result<String, BookmarkError> {
        require(owner, "owner")?;
        require(id, "id")?;

        let node = self
            .repo
            .in_unit_of_work(|store| -> Result<BookmarkNode, BookmarkError> {
                let mut node = store.get_by_id(id, owner)?;
                if node.is_folder() {
                    return Err(BookmarkError::validation(format!(
                        "cannot fetch and forward folder '{}'",
                        id
                    )));
                }
                node.highlight = 0;
                node.access_count += 1;
                store.update(&node)?;
                Ok(node)
            })
            .map_err(|e| {
                error!(owner, id, error = %e, "could not fetch and update bookmark");
                e.with_context("error fetching and updating bookmark")
            })?;

        self.schedule_refresh(&node);
        let url = node
            .url
            .ok_or_else(|| BookmarkError::validation(format!("bookmark '{}' has no URL", id)))?;
        info!(owner, id, url = %url, "forwarding to bookmark URL");
        Ok(url)
    }

    fn get_bookmark_by_id(&self, id: &str, owner: &str) -> Result<BookmarkNode, BookmarkError> {
        require(owner, "owner")?;
        require(id, "id")?;
        self.repo.get_by_id(id, owner).map_err(|e| match e {
            StoreError::NotFound(_) => BookmarkError::not_found(format!("no bookmark with ID '{}'", id)),
            other => BookmarkError::from(other).with_context("could not fetch bookmark"),
        })
    }

    /// The root path is answered without touching storage.
    fn get_folder_by_path(&self, path: &str, owner: &str) -> Result<FolderView, BookmarkError> {
        require(owner, "owner")?;
        let path = validated_path(path)?;
        if path == ROOT_PATH {
            return Ok(FolderView::SyntheticRoot {
                owner: owner.to_string(),
            });
        }
        match self.repo.get_folder_by_path(&path, owner) {
            Ok(folder) => Ok(FolderView::Stored(folder)),
            Err(StoreError::NotFound(_)) => Err(BookmarkError::not_found(format!(
                "no folder for path '{}' found",
                path
            ))),
            Err(e) => Err(BookmarkError::from(e).with_context(format!("cannot get folder '{}'", path))),
        }
    }

    fn get_bookmarks_by_path(&self, path: &str, owner: &str) -> Result<Vec<BookmarkNode>, BookmarkError> {
        require(owner, "owner")?;
        let path = validated_path(path)?;
        debug!(owner, path = %path, "get bookmarks by path");
        Ok(soft_fail(self.repo.get_by_path(&path, owner), "bookmarks by path"))
    }

    fn get_bookmarks_by_name(&self, name: &str, owner: &str) -> Result<Vec<BookmarkNode>, BookmarkError> {
        require(owner, "owner")?;
        require(name, "name")?;
        debug!(owner, name, "get bookmarks by name");
        Ok(soft_fail(self.repo.get_by_name(name.trim(), owner), "bookmarks by name"))
    }

    fn get_most_recent(&self, owner: &str) -> Result<Vec<BookmarkNode>, BookmarkError> {
        require(owner, "owner")?;
        Ok(soft_fail(
            self.repo.get_most_recent(owner, self.most_recent_limit),
            "most recent bookmarks",
        ))
    }

    fn get_all_paths(&self, owner: &str) -> Result<Vec<String>, BookmarkError> {
        require(owner, "owner")?;
        Ok(soft_fail(self.repo.get_all_paths(owner), "bookmark paths"))
    }

    /// The bookmark's durable favicon, or a built-in icon for its kind.
    fn get_bookmark_favicon(&self, id: &str, owner: &str) -> Result<ObjectInfo, BookmarkError> {
        let node = self.get_bookmark_by_id(id, owner)?;
        let fallback = default_icon(node.kind);
        if node.favicon.is_empty() {
            return Ok(fallback);
        }
        match self.favicons.durable(&node.favicon) {
            Ok(Some(artifact)) => Ok(artifact.into()),
            Ok(None) => {
                warn!(id, favicon = %node.favicon, "a favicon was defined but is not available");
                Ok(fallback)
            }
            Err(e) => {
                warn!(id, favicon = %node.favicon, error = %e, "could not load favicon");
                Ok(fallback)
            }
        }
    }

    fn get_favicon_by_id(&self, favicon_id: &str) -> Result<ObjectInfo, BookmarkError> {
        require(favicon_id, "favicon id")?;
        match self.favicons.durable(favicon_id) {
            Ok(Some(artifact)) => Ok(artifact.into()),
            Ok(None) => Err(BookmarkError::not_found(format!(
                "could not find favicon with ID '{}'",
                favicon_id
            ))),
            Err(e) => Err(BookmarkError::from(e).with_context("could not fetch favicon")),
        }
    }

    /// Distinct favicons in use by the owner's bookmarks, optionally narrowed
    /// by a name search. Identical payloads are listed once; payloads are not
    /// included.
    fn get_available_favicons(&self, owner: &str, search: &str) -> Result<Vec<ObjectInfo>, BookmarkError> {
        require(owner, "owner")?;
        let search = search.trim();
        let bookmarks = if search.is_empty() {
            self.repo.get_all(owner)
        } else {
            self.repo.get_by_name(search, owner)
        }
        .map_err(|e| BookmarkError::from(e).with_context(format!("could not retrieve bookmarks for '{}'", owner)))?;

        let mut ids: Vec<&str> = bookmarks
            .iter()
            .map(|b| b.favicon.as_str())
            .filter(|f| !f.is_empty())
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let mut seen_payloads = std::collections::HashSet::new();
        let mut favicons = Vec::new();
        for id in ids {
            let artifact = match self.favicons.durable(id) {
                Ok(Some(artifact)) if !artifact.payload.is_empty() => artifact,
                Ok(_) => continue,
                Err(e) => {
                    warn!(favicon = id, error = %e, "could not load favicon");
                    continue;
                }
            };
            if seen_payloads.insert(ring::digest::digest(&ring::digest::SHA256, &artifact.payload).as_ref().to_vec()) {
                favicons.push(ObjectInfo {
                    name: artifact.id,
                    payload: Vec::new(),
                    modified: artifact.last_modified,
                });
            }
        }
        favicons.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(favicons)
    }
}

// ── Validation ─────────────────────────────────────────────────────

fn require(value: &str, what: &str) -> Result<(), BookmarkError> {
    if value.trim().is_empty() {
        return Err(BookmarkError::validation(format!("missing {}", what)));
    }
    Ok(())
}

fn validated_path(raw: &str) -> Result<String, BookmarkError> {
    let raw = raw.trim();
    require(raw, "path")?;
    if !raw.starts_with('/') {
        return Err(BookmarkError::validation(format!("path '{}' must start with '/'", raw)));
    }
    Ok(normalize_path(raw))
}

fn validated_name(raw: &str) -> Result<String, BookmarkError> {
    let name = raw.trim();
    require(name, "display name")?;
    if name.contains('/') {
        return Err(BookmarkError::validation(format!(
            "display name '{}' must not contain '/'",
            name
        )));
    }
    Ok(name.to_string())
}

/// Nodes need a URL; folders never store one.
fn validated_url(kind: NodeKind, url: Option<&str>) -> Result<Option<String>, BookmarkError> {
    match kind {
        NodeKind::Folder => Ok(None),
        NodeKind::Node => match url.map(str::trim) {
            Some(url) if !url.is_empty() => Ok(Some(url.to_string())),
            _ => Err(BookmarkError::validation("missing URL for bookmark")),
        },
    }
}

/// A folder may not move onto its own full-path or anywhere below it.
fn check_move(existing: &BookmarkNode, destination: &str) -> Result<(), BookmarkError> {
    if !existing.is_folder() {
        return Ok(());
    }
    let source = existing.full_path();
    if is_within(destination, &source) {
        error!(
            folder = %source,
            destination,
            "a folder cannot be moved into itself"
        );
        return Err(BookmarkError::validation("cannot move folder into itself"));
    }
    Ok(())
}

// ── Tree maintenance (inside a unit of work) ───────────────────────

fn ensure_parent(store: &dyn BookmarkStore, path: &str, owner: &str) -> Result<(), BookmarkError> {
    if path == ROOT_PATH {
        return Ok(());
    }
    match store.get_folder_by_path(path, owner) {
        Ok(_) => Ok(()),
        Err(StoreError::NotFound(_)) => Err(BookmarkError::validation(format!(
            "parent folder '{}' does not exist",
            path
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Folders are addressed by full-path, so two folders may not share one.
/// Validates moving or renaming `existing` to `path`/`display_name`.
///
/// A moved entry needs an existing parent. A folder may not move into its
/// own subtree or land on another folder's full-path.
fn check_relocation(
    store: &dyn BookmarkStore,
    existing: &BookmarkNode,
    path: &str,
    display_name: &str,
    owner: &str,
) -> Result<(), BookmarkError> {
    check_move(existing, path)?;
    let path_changed = existing.path != path;
    if path_changed {
        ensure_parent(store, path, owner)?;
    }
    if existing.is_folder() && (path_changed || existing.display_name != display_name) {
        ensure_unique_folder(store, &join_path(path, display_name), owner, &existing.id)?;
    }
    Ok(())
}

/// The parent of a new entry must exist, and a new folder must not collide.
fn check_placement(store: &dyn BookmarkStore, node: &BookmarkNode, owner: &str) -> Result<(), BookmarkError> {
    ensure_parent(store, &node.path, owner)?;
    if node.is_folder() {
        ensure_unique_folder(store, &node.full_path(), owner, &node.id)?;
    }
    Ok(())
}

fn ensure_unique_folder(
    store: &dyn BookmarkStore,
    full_path: &str,
    owner: &str,
    own_id: &str,
) -> Result<(), BookmarkError> {
    match store.get_folder_by_path(full_path, owner) {
        Ok(other) if other.id != own_id => Err(BookmarkError::validation(format!(
            "a folder '{}' already exists",
            full_path
        ))),
        Ok(_) | Err(StoreError::NotFound(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn child_count_of(store: &dyn BookmarkStore, path: &str, owner: &str) -> Result<i64, StoreError> {
    Ok(store
        .get_child_count(path, owner)?
        .into_iter()
        .find(|c| c.path == path)
        .map(|c| c.count)
        .unwrap_or(0))
}

/// Stores the number of rows below `path` on the folder owning that path.
fn update_child_count(store: &dyn BookmarkStore, path: &str, owner: &str) -> Result<(), BookmarkError> {
    if path == ROOT_PATH {
        return Ok(());
    }
    let mut folder = store.get_folder_by_path(path, owner).map_err(|e| {
        error!(path, error = %e, "cannot get the folder for path");
        BookmarkError::server(format!("cannot get the folder for path '{}'", path), e)
    })?;
    let count = child_count_of(store, path, owner)?;
    if folder.child_count != count {
        debug!(path, from = folder.child_count, to = count, "update child count");
        folder.child_count = count;
        store.update(&folder)?;
    }
    Ok(())
}

/// Rewrites the path of every row at or below `old_prefix`.
fn rewrite_subtree(
    store: &dyn BookmarkStore,
    old_prefix: &str,
    new_prefix: &str,
    owner: &str,
) -> Result<(), BookmarkError> {
    let mut descendants = store.get_by_path_prefix(old_prefix, owner)?;
    descendants.sort_by(|a, b| a.path.cmp(&b.path));
    info!(from = old_prefix, to = new_prefix, count = descendants.len(), "rewrite subtree paths");

    let now = unix_now();
    for mut node in descendants {
        let Some(path) = rebase_path(&node.path, old_prefix, new_prefix) else {
            continue;
        };
        node.path = path;
        node.modified_at = Some(now);
        store.update(&node)?;
    }
    Ok(())
}

// ── Helpers ────────────────────────────────────────────────────────

fn soft_fail<T>(result: Result<Vec<T>, StoreError>, what: &str) -> Vec<T> {
    result.unwrap_or_else(|e| {
        error!(error = %e, "cannot get {}", what);
        Vec::new()
    })
}

fn default_icon(kind: NodeKind) -> ObjectInfo {
    let payload = match kind {
        NodeKind::Node => DEFAULT_NODE_ICON,
        NodeKind::Folder => DEFAULT_FOLDER_ICON,
    };
    ObjectInfo {
        name: DEFAULT_ICON_NAME.to_string(),
        payload: payload.to_vec(),
        modified: DEFAULT_ICON_MODIFIED,
    }
}
