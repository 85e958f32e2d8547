use serde::{Deserialize, Serialize};

/// Path of the virtual root folder. It is never persisted.
pub const ROOT_PATH: &str = "/";

/// Suffix appended to the owner name to form the ID of the synthesized root.
pub const ROOT_ID_SUFFIX: &str = "_ROOT";

/// Display name of the synthesized root folder.
pub const ROOT_DISPLAY_NAME: &str = "Root";

/// Distinguishes leaf bookmarks from folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A leaf entry carrying a URL.
    Node,
    /// A grouping entry; its children store the folder's full-path as their `path`.
    Folder,
}

impl NodeKind {
    /// Integer representation used by the `bookmarks.kind` column.
    pub fn as_i64(self) -> i64 {
        match self {
            NodeKind::Node => 0,
            NodeKind::Folder => 1,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(NodeKind::Node),
            1 => Some(NodeKind::Folder),
            _ => None,
        }
    }
}

/// A stored bookmark or folder.
///
/// `path` is the full-path of the parent folder, so an entry in the root has
/// `path == "/"` and a child of folder `A` (itself in the root) has `path == "/A"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkNode {
    pub id: String,
    pub owner: String,
    pub path: String,
    pub display_name: String,
    pub kind: NodeKind,
    pub url: Option<String>,
    pub sort_order: i64,
    pub child_count: i64,
    pub highlight: i64,
    pub access_count: i64,
    pub favicon: String,
    /// Render the favicon with inverted colors, for dark icons on dark themes.
    #[serde(default)]
    pub invert_favicon_color: bool,
    pub created_at: i64,
    pub modified_at: Option<i64>,
}

impl BookmarkNode {
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// The path written into this entry's direct children when it is a folder.
    pub fn full_path(&self) -> String {
        join_path(&self.path, &self.display_name)
    }
}

/// Caller supplied values for create and update.
///
/// `favicon` is either empty, the ID of a staged artifact, or a reference of
/// the form `existing://<id>` pointing at an artifact already in the durable store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookmarkInput {
    pub id: String,
    pub path: String,
    pub display_name: String,
    pub kind: Option<NodeKind>,
    pub url: Option<String>,
    pub sort_order: i64,
    pub highlight: i64,
    pub favicon: String,
    pub invert_favicon_color: bool,
}

/// Number of rows stored under one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCount {
    pub path: String,
    pub count: i64,
}

/// A batch of sort-order assignments applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SortOrderBatch {
    pub ids: Vec<String>,
    pub orders: Vec<i64>,
}

/// Result of a folder lookup by path.
#[derive(Debug, Clone, PartialEq)]
pub enum FolderView {
    /// The virtual root, synthesized for an owner without touching storage.
    SyntheticRoot { owner: String },
    /// A folder row loaded from storage.
    Stored(BookmarkNode),
}

impl FolderView {
    pub fn is_root(&self) -> bool {
        matches!(self, FolderView::SyntheticRoot { .. })
    }

    /// Converts the view into a node, materializing the root on the fly.
    pub fn into_node(self) -> BookmarkNode {
        match self {
            FolderView::Stored(node) => node,
            FolderView::SyntheticRoot { owner } => BookmarkNode {
                id: format!("{}{}", owner, ROOT_ID_SUFFIX),
                owner,
                path: ROOT_PATH.to_string(),
                display_name: ROOT_DISPLAY_NAME.to_string(),
                kind: NodeKind::Folder,
                url: None,
                sort_order: 0,
                child_count: 0,
                highlight: 0,
                access_count: 0,
                favicon: String::new(),
                invert_favicon_color: false,
                created_at: 0,
                modified_at: None,
            },
        }
    }
}

/// Collapses repeated slashes and strips a trailing slash, keeping `/` intact.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        out.push(c);
    }
    while out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// Full-path of an entry named `name` stored under `path`.
pub fn join_path(path: &str, name: &str) -> String {
    normalize_path(&format!("{}/{}", path, name))
}

/// True when `path` equals `prefix` or lies below it, compared segment by segment.
pub fn is_within(path: &str, prefix: &str) -> bool {
    if prefix == ROOT_PATH {
        return path.starts_with('/');
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Replaces the leading `old_prefix` of `path` with `new_prefix`.
///
/// Returns `None` when `path` is not within `old_prefix`.
pub fn rebase_path(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if !is_within(path, old_prefix) {
        return None;
    }
    let suffix = &path[old_prefix.len()..];
    Some(normalize_path(&format!("{}{}", new_prefix, suffix)))
}
