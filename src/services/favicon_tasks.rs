//! Background favicon refresh.
//!
//! After a bookmark without favicon is saved or visited, a task resolves the
//! page icon, stages and promotes it, then assigns it in a unit of work of
//! its own. Failures are logged and reported through [`FaviconOutcome`];
//! they never reach the caller of the original mutation.

use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::favicon_service::FaviconService;
use crate::store::BookmarkRepository;
use crate::types::errors::StoreError;
use crate::types::unix_now;

/// Result of one background refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaviconOutcome {
    /// The favicon was stored and assigned to the bookmark.
    Assigned { id: String, favicon: String },
    /// Nothing was assigned, e.g. the bookmark got a favicon in the meantime.
    Skipped { id: String, reason: String },
    Failed { id: String, error: String },
}

impl FaviconOutcome {
    fn log(&self) {
        match self {
            FaviconOutcome::Assigned { id, favicon } => {
                info!(id = %id, favicon = %favicon, "background favicon assigned")
            }
            FaviconOutcome::Skipped { id, reason } => {
                debug!(id = %id, reason = %reason, "background favicon skipped")
            }
            FaviconOutcome::Failed { id, error } => {
                warn!(id = %id, error = %error, "background favicon failed")
            }
        }
    }
}

/// Tracks spawned refresh tasks so they can be drained on shutdown.
pub struct FaviconTasks<R> {
    repo: Arc<R>,
    favicons: Arc<FaviconService>,
    tasks: Mutex<JoinSet<FaviconOutcome>>,
}

impl<R: BookmarkRepository + 'static> FaviconTasks<R> {
    pub fn new(repo: Arc<R>, favicons: Arc<FaviconService>) -> Self {
        Self {
            repo,
            favicons,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Spawns a refresh for bookmark `id` whose page lives at `url`.
    ///
    /// Returns `false` when no tokio runtime is available on this thread.
    pub fn schedule(&self, owner: &str, id: &str, url: &str) -> bool {
        let Ok(handle) = Handle::try_current() else {
            debug!(id, "no async runtime, favicon refresh skipped");
            return false;
        };
        let Ok(mut tasks) = self.tasks.lock() else {
            warn!(id, "favicon task set poisoned, refresh skipped");
            return false;
        };
        while let Some(finished) = tasks.try_join_next() {
            if let Ok(outcome) = finished {
                outcome.log();
            }
        }
        tasks.spawn_on(
            refresh(
                self.repo.clone(),
                self.favicons.clone(),
                owner.to_string(),
                id.to_string(),
                url.to_string(),
            ),
            &handle,
        );
        debug!(id, url, "favicon refresh scheduled");
        true
    }

    /// Number of tasks not yet collected.
    pub fn pending(&self) -> usize {
        self.tasks.lock().map(|t| t.len()).unwrap_or(0)
    }

    /// Waits for every scheduled task and returns their outcomes.
    pub async fn shutdown(&self) -> Vec<FaviconOutcome> {
        let mut set = match self.tasks.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => return Vec::new(),
        };
        let mut outcomes = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => {
                    outcome.log();
                    outcomes.push(outcome);
                }
                Err(err) => warn!(error = %err, "favicon task aborted"),
            }
        }
        outcomes
    }
}

async fn refresh<R: BookmarkRepository>(
    repo: Arc<R>,
    favicons: Arc<FaviconService>,
    owner: String,
    id: String,
    url: String,
) -> FaviconOutcome {
    let failed = |error: String| FaviconOutcome::Failed {
        id: id.clone(),
        error,
    };

    let staged = match favicons.stage_from_page(&url).await {
        Ok(staged) => staged,
        Err(err) => return failed(err.to_string()),
    };
    let promoted = favicons.promote(&staged.name);
    favicons.discard_staged(&staged.name);
    let favicon = match promoted {
        Ok(favicon) => favicon,
        Err(err) => return failed(err.to_string()),
    };

    let assigned = repo.in_unit_of_work(|store| -> Result<bool, StoreError> {
        let mut node = store.get_by_id(&id, &owner)?;
        if !node.favicon.is_empty() {
            return Ok(false);
        }
        node.favicon = favicon.clone();
        node.modified_at = Some(unix_now());
        store.update(&node)?;
        Ok(true)
    });

    let reason = match assigned {
        Ok(true) => {
            return FaviconOutcome::Assigned {
                id: id.clone(),
                favicon,
            }
        }
        Ok(false) => "bookmark already has a favicon",
        Err(StoreError::NotFound(_)) => "bookmark no longer exists",
        Err(err) => return failed(err.to_string()),
    };
    discard_unreferenced(repo.as_ref(), &favicons, &favicon);
    FaviconOutcome::Skipped {
        id: id.clone(),
        reason: reason.to_string(),
    }
}

/// Drops a freshly promoted favicon that ended up assigned to nothing.
fn discard_unreferenced<R: BookmarkRepository>(repo: &R, favicons: &FaviconService, favicon: &str) {
    match repo.count_favicon_references(favicon) {
        Ok(0) => {
            if let Err(err) = favicons.release(favicon) {
                warn!(favicon, error = %err, "could not release unused favicon");
            }
        }
        Ok(_) => {}
        Err(err) => warn!(favicon, error = %err, "could not count favicon references"),
    }
}
