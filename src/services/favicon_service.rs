//! Staging and promotion of favicons.
//!
//! Fetched and uploaded icons are resized and written to the local staging
//! area. They are copied into the durable store once a bookmark references
//! them, and the staging copy is dropped after that write commits.

use std::sync::Arc;

use tracing::{info, warn};

use super::favicon_cache::LocalFaviconCache;
use super::favicon_resolver::{FaviconResolver, FetchType};
use super::image_resizer::resize_image;
use crate::store::FaviconRepository;
use crate::types::errors::FaviconError;
use crate::types::favicon::{existing_favicon_id, FaviconArtifact, FetchedContent, ObjectInfo};

pub struct FaviconService {
    cache: LocalFaviconCache,
    durable: Arc<dyn FaviconRepository>,
    resolver: FaviconResolver,
    width: i32,
}

impl FaviconService {
    /// `width` is the staging width; the height follows the aspect ratio.
    pub fn new(
        cache: LocalFaviconCache,
        durable: Arc<dyn FaviconRepository>,
        resolver: FaviconResolver,
        width: i32,
    ) -> Self {
        Self {
            cache,
            durable,
            resolver,
            width,
        }
    }

    /// Copies a staged favicon into the durable store and returns its durable ID.
    ///
    /// `existing://<id>` references are returned as `<id>` without touching
    /// either store. The staging copy is kept; callers drop it with
    /// [`Self::discard_staged`] once the referencing write has committed.
    pub fn promote(&self, reference: &str) -> Result<String, FaviconError> {
        if let Some(id) = existing_favicon_id(reference) {
            if id.is_empty() {
                return Err(FaviconError::InvalidId(reference.to_string()));
            }
            return Ok(id.to_string());
        }

        let staged = self.cache.read_local(reference)?;
        self.durable.save(&FaviconArtifact {
            id: staged.name.clone(),
            payload: staged.payload,
            last_modified: staged.modified,
        })?;
        info!(favicon = %staged.name, "favicon promoted to durable store");
        Ok(staged.name)
    }

    /// Removes the staging copy behind `reference`. Failures are logged and
    /// otherwise ignored; `existing://` references have no staging copy.
    pub fn discard_staged(&self, reference: &str) {
        if !is_staged_reference(reference) {
            return;
        }
        if let Err(err) = self.cache.remove_local(reference) {
            warn!(favicon = reference, error = %err, "could not remove staged favicon");
        }
    }

    /// Resizes `content` and writes it to the staging area.
    ///
    /// A payload that cannot be resized is staged as fetched.
    pub fn stage(&self, content: FetchedContent) -> Result<ObjectInfo, FaviconError> {
        if content.payload.is_empty() {
            return Err(FaviconError::EmptyPayload(content.url));
        }
        let content = match resize_image(content.clone(), self.width, 0) {
            Ok(resized) => resized,
            Err(err) => {
                warn!(url = %content.url, error = %err, "could not resize favicon, keeping original");
                content
            }
        };
        self.cache.write_local(&content.file_name, &content.payload)
    }

    /// Discovers the favicon of the page at `url` and stages it.
    pub async fn stage_from_page(&self, url: &str) -> Result<ObjectInfo, FaviconError> {
        let content = self.resolver.resolve(url).await?;
        info!(url, size = content.payload.len(), "fetched favicon from page");
        self.stage(content)
    }

    /// Fetches an image directly from `url` and stages it.
    pub async fn stage_from_image_url(&self, url: &str) -> Result<ObjectInfo, FaviconError> {
        let content = self.resolver.fetch(url, FetchType::Image).await?;
        info!(url, size = content.payload.len(), "fetched favicon image");
        self.stage(content)
    }

    /// Stages a favicon supplied by the client instead of fetched from the web.
    pub fn stage_upload(&self, name: &str, mime_type: &str, payload: Vec<u8>) -> Result<ObjectInfo, FaviconError> {
        info!(name, size = payload.len(), "staging uploaded favicon");
        self.stage(FetchedContent {
            url: name.to_string(),
            file_name: name.to_string(),
            mime_type: mime_type.to_string(),
            payload,
        })
    }

    pub fn read_staged(&self, id: &str) -> Result<ObjectInfo, FaviconError> {
        self.cache.read_local(id)
    }

    pub fn durable(&self, id: &str) -> Result<Option<FaviconArtifact>, FaviconError> {
        Ok(self.durable.get(id)?)
    }

    /// Deletes a durable favicon. Returns `false` when it was already gone.
    pub fn release(&self, id: &str) -> Result<bool, FaviconError> {
        Ok(self.durable.delete(id)?)
    }
}

/// True when `reference` names a staged artifact rather than a durable one.
pub fn is_staged_reference(reference: &str) -> bool {
    !reference.is_empty() && existing_favicon_id(reference).is_none()
}
