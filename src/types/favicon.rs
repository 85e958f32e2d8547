use serde::{Deserialize, Serialize};

/// Prefix marking a favicon reference that already lives in the durable store.
pub const EXISTING_FAVICON_PREFIX: &str = "existing://";

/// Name used when a fetched resource carries no usable filename.
pub const DEFAULT_FAVICON_NAME: &str = "favicon.ico";

/// A favicon persisted in the durable store, keyed by its content ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaviconArtifact {
    pub id: String,
    pub payload: Vec<u8>,
    pub last_modified: i64,
}

/// A favicon as handed to callers: staged, durable or one of the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub payload: Vec<u8>,
    pub modified: i64,
}

impl From<FaviconArtifact> for ObjectInfo {
    fn from(artifact: FaviconArtifact) -> Self {
        Self {
            name: artifact.id,
            payload: artifact.payload,
            modified: artifact.last_modified,
        }
    }
}

/// Raw result of an outbound fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContent {
    /// The URL the payload was finally read from.
    pub url: String,
    pub file_name: String,
    pub mime_type: String,
    pub payload: Vec<u8>,
}

/// Strips the `existing://` marker, returning the durable ID it references.
pub fn existing_favicon_id(reference: &str) -> Option<&str> {
    reference.strip_prefix(EXISTING_FAVICON_PREFIX)
}
