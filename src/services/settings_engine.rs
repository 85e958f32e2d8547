// Settings Engine
// Loads and persists AppSettings as a JSON file, with dot-notation updates of single values.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::types::errors::SettingsError;
use crate::types::settings::AppSettings;

/// Default location of the settings file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "bookmarks.json";

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<AppSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &AppSettings;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

/// Settings engine implementation that persists settings as JSON on disk.
pub struct SettingsEngine {
    config_path: String,
    settings: AppSettings,
}

impl SettingsEngine {
    /// Creates a new SettingsEngine reading from `path_override`, or
    /// [`DEFAULT_CONFIG_FILE`] when none is given.
    pub fn new(path_override: Option<String>) -> Self {
        Self {
            config_path: path_override.unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string()),
            settings: AppSettings::default(),
        }
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from the JSON config file.
    ///
    /// A missing file yields the defaults; a malformed one is a serialization error.
    fn load(&mut self) -> Result<AppSettings, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            debug!(path = %self.config_path, "no settings file, using defaults");
            self.settings = AppSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::Io(format!("failed to read config file: {}", e)))?;

        self.settings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::Serialization(format!("failed to parse config file: {}", e))
        })?;
        info!(path = %self.config_path, "settings loaded");
        Ok(self.settings.clone())
    }

    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::Io(format!("failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::Serialization(format!("failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::Io(format!("failed to write config file: {}", e)))
    }

    fn get_settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Updates a single value addressed by a dot-separated key, e.g.
    /// `"favicon.width"` or `"storage.database_path"`, then saves to disk.
    ///
    /// The updated tree is deserialized back into `AppSettings`, so a value of
    /// the wrong type is rejected and nothing is persisted.
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("key cannot be empty".to_string()));
        }

        let mut json_value = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::Serialization(format!("failed to serialize settings: {}", e))
        })?;

        let parts: Vec<&str> = key.split('.').collect();
        let (last, parents) = match parts.split_last() {
            Some(split) => split,
            None => return Err(SettingsError::InvalidKey(key.to_string())),
        };

        let mut current = &mut json_value;
        for part in parents {
            current = current
                .get_mut(*part)
                .ok_or_else(|| SettingsError::InvalidKey(format!("key '{}' not found", key)))?;
        }
        match current {
            serde_json::Value::Object(map) if map.contains_key(*last) => {
                map.insert(last.to_string(), value);
            }
            _ => return Err(SettingsError::InvalidKey(format!("key '{}' not found", key))),
        }

        self.settings = serde_json::from_value(json_value).map_err(|e| {
            SettingsError::InvalidValue(format!("invalid value for key '{}': {}", key, e))
        })?;

        self.save()
    }

    /// Resets all settings to defaults and saves to disk.
    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = AppSettings::default();
        self.save()
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
