use serde::{Deserialize, Serialize};

/// Runtime configuration, persisted as JSON by the settings engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub storage: StorageSettings,
    pub favicon: FaviconSettings,
    pub logging: LoggingSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            storage: StorageSettings::default(),
            favicon: FaviconSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Where bookmark rows and staged favicons are kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    pub database_path: String,
    pub favicon_staging_path: String,
    /// Upper bound for the most-recent projection.
    pub most_recent_limit: u32,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: "bookmarks.db".to_string(),
            favicon_staging_path: "favicons/staging".to_string(),
            most_recent_limit: 100,
        }
    }
}

/// Favicon fetching and post-processing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FaviconSettings {
    /// Target width of staged icons; the height follows the aspect ratio.
    pub width: i32,
    pub user_agent: String,
    /// Schedule a background fetch for nodes saved without a favicon.
    pub background_refresh: bool,
}

impl Default for FaviconSettings {
    fn default() -> Self {
        Self {
            width: 50,
            user_agent: format!("bookmarks/{}", env!("CARGO_PKG_VERSION")),
            background_refresh: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
