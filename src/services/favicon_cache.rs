//! Local staging area for fetched favicons.
//!
//! Artifacts are written into a flat directory under their content ID, so
//! staging the same payload under the same name twice yields one file.

use std::fs;
use std::path::{Path, PathBuf};

use ring::digest;
use tracing::{debug, warn};

use crate::types::errors::FaviconError;
use crate::types::favicon::ObjectInfo;
use crate::types::unix_now;

/// Filesystem-backed favicon staging directory.
pub struct LocalFaviconCache {
    root: PathBuf,
}

impl LocalFaviconCache {
    /// Opens the staging directory, creating it when missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, FaviconError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `hex(sha256(payload)) + "_" + hex(sha256(name)) + extension(name)`.
    pub fn content_id(name: &str, payload: &[u8]) -> String {
        let payload_hash = digest::digest(&digest::SHA256, payload);
        let name_hash = digest::digest(&digest::SHA256, name.as_bytes());
        format!(
            "{}_{}{}",
            hex_encode(payload_hash.as_ref()),
            hex_encode(name_hash.as_ref()),
            extension_of(name)
        )
    }

    /// Stages `payload` under its content ID and returns the artifact.
    pub fn write_local(&self, name: &str, payload: &[u8]) -> Result<ObjectInfo, FaviconError> {
        if payload.is_empty() {
            return Err(FaviconError::EmptyPayload(name.to_string()));
        }
        let id = Self::content_id(name, payload);
        let path = self.path_for(&id)?;
        fs::write(&path, payload)?;
        debug!(id = %id, name, size = payload.len(), "favicon staged");
        Ok(ObjectInfo {
            name: id,
            payload: payload.to_vec(),
            modified: unix_now(),
        })
    }

    /// Reads a staged artifact. A zero-length file counts as an incomplete write.
    pub fn read_local(&self, id: &str) -> Result<ObjectInfo, FaviconError> {
        let path = self.path_for(id)?;
        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FaviconError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let payload = fs::read(&path)?;
        if payload.is_empty() {
            warn!(id, "staged favicon has an empty payload");
            return Err(FaviconError::EmptyPayload(id.to_string()));
        }
        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or_else(unix_now);
        Ok(ObjectInfo {
            name: id.to_string(),
            payload,
            modified,
        })
    }

    pub fn remove_local(&self, id: &str) -> Result<(), FaviconError> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FaviconError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Maps an ID to its staging path, refusing anything that is not a plain file name.
    fn path_for(&self, id: &str) -> Result<PathBuf, FaviconError> {
        let plain = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\', '\0']);
        if !plain {
            return Err(FaviconError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(id))
    }
}

/// Extension of `name` including the dot, or empty when absent or unusual.
fn extension_of(name: &str) -> String {
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!(".{}", ext)
        }
        _ => String::new(),
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
