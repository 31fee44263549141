//! The workspace model and its stored form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::default_layout;
use crate::layout::{Direction, LayoutNode, RestoreEntry};
use crate::storage::StorageAdapter;

pub const DEFAULT_SPLITTER_SIZE: u32 = 8;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("No stored workspace")]
    Missing,

    #[error("Stored workspace is not valid JSON")]
    Malformed(#[from] serde_json::Error),

    #[error("Stored workspace has no layout")]
    MissingLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    pub direction: Direction,
    pub splitter_size: u32,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        GlobalSettings {
            direction: Direction::default(),
            splitter_size: DEFAULT_SPLITTER_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    /// Restore entries keyed by component key (toggled panels) or tab id
    /// (closed tabs).
    #[serde(default)]
    pub restore_data: BTreeMap<String, RestoreEntry>,
    /// Version of the library that wrote the snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub written_by: Option<String>,
}

/// The live workspace: the layout tree plus settings that travel with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceModel {
    pub global: GlobalSettings,
    pub layout: LayoutNode,
    #[serde(default)]
    pub metadata: ModelMetadata,
}

// Lenient mirror of `WorkspaceModel` used for loading. Snapshots written by
// older builds may omit any of the settings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredModel {
    #[serde(default)]
    global: StoredGlobal,
    layout: Option<LayoutNode>,
    #[serde(default)]
    metadata: ModelMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredGlobal {
    direction: Option<Direction>,
    splitter_size: Option<u32>,
}

impl WorkspaceModel {
    /// The pristine workspace with every panel visible.
    pub fn default_with(direction: Direction) -> Self {
        WorkspaceModel {
            global: GlobalSettings {
                direction,
                ..GlobalSettings::default()
            },
            layout: default_layout(),
            metadata: ModelMetadata::default(),
        }
    }

    /// Parses a stored snapshot. `fallback_direction` fills in a missing direction.
    pub fn from_snapshot(raw: &str, fallback_direction: Direction) -> Result<Self, LoadError> {
        let stored: StoredModel = serde_json::from_str(raw)?;
        let layout = stored.layout.ok_or(LoadError::MissingLayout)?;
        Ok(WorkspaceModel {
            global: GlobalSettings {
                direction: stored.global.direction.unwrap_or(fallback_direction),
                splitter_size: stored.global.splitter_size.unwrap_or(DEFAULT_SPLITTER_SIZE),
            },
            layout,
            metadata: stored.metadata,
        })
    }

    /// Reads and parses the snapshot stored under `key`.
    pub fn load(storage: &dyn StorageAdapter, key: &str, fallback_direction: Direction) -> Result<Self, LoadError> {
        let raw = storage.get(key).ok_or(LoadError::Missing)?;
        Self::from_snapshot(&raw, fallback_direction)
    }

    pub fn to_snapshot(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A model as reported by the layout engine after a user edit. Every part
/// except the tree may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUpdate {
    pub layout: LayoutNode,
    #[serde(default)]
    pub global: GlobalUpdate,
    #[serde(default)]
    pub metadata: MetadataUpdate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splitter_size: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_data: Option<BTreeMap<String, RestoreEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub written_by: Option<String>,
}

impl ModelUpdate {
    /// An update carrying only a tree.
    pub fn layout_only(layout: LayoutNode) -> Self {
        ModelUpdate {
            layout,
            global: GlobalUpdate::default(),
            metadata: MetadataUpdate::default(),
        }
    }
}

impl From<WorkspaceModel> for ModelUpdate {
    fn from(model: WorkspaceModel) -> Self {
        ModelUpdate {
            layout: model.layout,
            global: GlobalUpdate {
                direction: Some(model.global.direction),
                splitter_size: Some(model.global.splitter_size),
            },
            metadata: MetadataUpdate {
                restore_data: Some(model.metadata.restore_data),
                written_by: model.metadata.written_by,
            },
        }
    }
}
