//! Built-in settings and the values read once at startup.

use std::time::Duration;

use tracing::{debug, warn};

use crate::layout::Direction;
use crate::model::WorkspaceModel;
use crate::storage::StorageAdapter;

/// Key holding the serialized workspace.
pub const STORAGE_KEY: &str = "demo-layout";

/// Key holding the persistence-enabled flag as a JSON boolean.
pub const ENABLED_KEY: &str = "demo-storage-enabled";

pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Directory created under the home directory when the host has no data path.
pub const DATA_DIR_NAME: &str = ".layout-manager-demo";

pub const STORAGE_FILE_NAME: &str = "storage.json";

pub const APP_NAME: &str = "tabstash";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub storage_key: String,
    pub enabled_key: String,
    pub debounce: Duration,
    /// Subdirectory of the platform data directory.
    pub app_name: String,
    pub data_dir_name: String,
    pub storage_file_name: String,
    pub default_direction: Direction,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_key: STORAGE_KEY.to_string(),
            enabled_key: ENABLED_KEY.to_string(),
            debounce: DEBOUNCE_WINDOW,
            app_name: APP_NAME.to_string(),
            data_dir_name: DATA_DIR_NAME.to_string(),
            storage_file_name: STORAGE_FILE_NAME.to_string(),
            default_direction: Direction::default(),
        }
    }
}

/// Settings resolved from storage before the workspace is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupConfig {
    pub persistence_enabled: bool,
    pub direction: Direction,
}

impl StartupConfig {
    /// Reads the enabled flag and, if persistence is on, the direction of the
    /// stored snapshot. Anything missing or unreadable falls back to `config`.
    pub fn read(storage: &dyn StorageAdapter, config: &Config) -> Self {
        let persistence_enabled = match storage.get(&config.enabled_key) {
            None => true,
            Some(raw) => serde_json::from_str::<bool>(&raw).unwrap_or_else(|e| {
                warn!("Ignoring malformed '{}' value {:?}: {}", config.enabled_key, raw, e);
                true
            }),
        };

        let mut direction = config.default_direction;
        if persistence_enabled {
            if let Some(raw) = storage.get(&config.storage_key) {
                match WorkspaceModel::from_snapshot(&raw, config.default_direction) {
                    Ok(model) => direction = model.global.direction,
                    Err(e) => debug!("Stored workspace not usable for startup direction: {}", e),
                }
            }
        }

        StartupConfig {
            persistence_enabled,
            direction,
        }
    }
}
