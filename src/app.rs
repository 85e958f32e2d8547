//! App Core for the bookmark service.
//!
//! Central struct wiring the database, repositories, favicon services and the
//! bookmark manager from [`AppSettings`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::database::connection::Database;
use crate::managers::bookmark_manager::BookmarkManager;
use crate::services::favicon_cache::LocalFaviconCache;
use crate::services::favicon_resolver::{FaviconResolver, HttpFetcher, ReqwestFetcher};
use crate::services::favicon_service::FaviconService;
use crate::services::favicon_tasks::{FaviconOutcome, FaviconTasks};
use crate::services::settings_engine::SettingsEngine;
use crate::store::{SqliteBookmarkStore, SqliteFaviconStore};
use crate::types::errors::BoxError;
use crate::types::settings::AppSettings;

/// Central application struct holding the bookmark manager and its storage.
pub struct App {
    pub settings: AppSettings,
    pub db: Arc<Database>,
    pub bookmarks: BookmarkManager<SqliteBookmarkStore>,
    /// Backing file of `settings`. Changes made through it apply on the next start.
    pub settings_engine: Option<Mutex<SettingsEngine>>,
}

impl App {
    /// Opens the database and staging area below `data_dir` and fetches
    /// favicons over HTTP.
    ///
    /// Absolute paths in the settings are used as they are.
    pub fn new(settings: AppSettings, data_dir: &Path) -> Result<Self, BoxError> {
        let fetcher = Arc::new(ReqwestFetcher::new(&settings.favicon.user_agent)?);
        let db = Arc::new(Database::open(data_dir.join(&settings.storage.database_path))?);
        let staging = data_dir.join(&settings.storage.favicon_staging_path);
        Self::assemble(settings, db, staging, fetcher)
    }

    /// Wires all components around an already opened database.
    pub fn assemble(
        settings: AppSettings,
        db: Arc<Database>,
        staging_dir: PathBuf,
        fetcher: Arc<dyn HttpFetcher>,
    ) -> Result<Self, BoxError> {
        let repo = Arc::new(SqliteBookmarkStore::new(db.clone()));
        let durable = Arc::new(SqliteFaviconStore::new(db.clone()));
        let cache = LocalFaviconCache::new(&staging_dir)?;
        let favicons = Arc::new(FaviconService::new(
            cache,
            durable,
            FaviconResolver::new(fetcher),
            settings.favicon.width,
        ));

        let mut bookmarks = BookmarkManager::new(repo.clone(), favicons.clone())
            .with_most_recent_limit(settings.storage.most_recent_limit);
        if settings.favicon.background_refresh {
            bookmarks = bookmarks.with_background_refresh(Arc::new(FaviconTasks::new(repo, favicons)));
        }
        bookmarks.check_store()?;

        info!(
            staging = %staging_dir.display(),
            background_refresh = settings.favicon.background_refresh,
            "bookmark service ready"
        );
        Ok(Self {
            settings,
            db,
            bookmarks,
            settings_engine: None,
        })
    }

    /// Attaches the engine `settings` were loaded from, enabling the
    /// `settings.*` methods to persist changes.
    pub fn with_settings_engine(mut self, engine: SettingsEngine) -> Self {
        self.settings_engine = Some(Mutex::new(engine));
        self
    }

    /// Shutdown sequence: waits for pending background favicon fetches.
    pub async fn shutdown(&self) -> Vec<FaviconOutcome> {
        match self.bookmarks.favicon_tasks() {
            Some(tasks) => {
                let outcomes = tasks.shutdown().await;
                info!(count = outcomes.len(), "background favicon tasks drained");
                outcomes
            }
            None => Vec::new(),
        }
    }
}
