//! The workspace facade: the live model plus everything that keeps it persisted.
//!
//! A [`Workspace`] owns the canonical [`WorkspaceModel`], the [`RestoreCache`],
//! the [`StateSynchronizer`] and a [`PersistenceController`] writing to the
//! storage adapter it was opened with. Every operation that changes the model
//! dispatches [`ModelChanged`]; the workspace's own autosave listener forwards
//! those to the controller, so a burst of operations becomes one write.
//!
//! # Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use tabstash_core::config::Config;
//! use tabstash_core::storage::MemoryStorage;
//! use tabstash_core::workspace::{ToggleOutcome, Workspace};
//!
//! let mut workspace = Workspace::open(Arc::new(MemoryStorage::new()), Config::default());
//! assert!(workspace.is_visible("messages"));
//!
//! assert_eq!(workspace.toggle_panel("messages"), ToggleOutcome::Hidden);
//! assert!(!workspace.is_visible("messages"));
//! assert_eq!(workspace.toggle_panel("messages"), ToggleOutcome::Shown);
//! ```

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{self, default_layout};
use crate::config::{Config, StartupConfig};
use crate::event::{define_event_listeners, ChangeReason, Listener, ModelChanged, PanelToggled};
use crate::layout::{
    find_by_id, remove_empty_containers, remove_node, restore_node, update_by_id, Direction, LayoutAction,
    LayoutError, LayoutNode, NodeUpdate, RestoreEntry,
};
use crate::model::{LoadError, ModelUpdate, WorkspaceModel};
use crate::persistence::PersistenceController;
use crate::restore::RestoreCache;
use crate::storage::{AdapterKind, StorageAdapter};
use crate::sync::StateSynchronizer;

define_event_listeners!(WorkspaceEvents {
    model_changed: ModelChanged,
    panel_toggled: PanelToggled,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Hidden,
    Shown,
    /// Not a known panel and nothing remembered under that key.
    UnknownPanel,
    /// No restore entry could be found, synthesized or applied. The layout is
    /// unchanged.
    NotRestorable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    /// Valid, but nothing changed.
    Ignored,
    /// Swallowed by the direction loop guard.
    Intercepted,
}

/// The live workspace.
///
/// Dropping it writes a commit still waiting for its debounce window.
#[derive(Debug)]
pub struct Workspace {
    storage: Arc<dyn StorageAdapter>,
    config: Config,
    model: WorkspaceModel,
    cache: RestoreCache,
    sync: StateSynchronizer,
    pristine: LayoutNode,
    persistence: Arc<PersistenceController>,
    _autosave: Listener<ModelChanged>,
    pub on: WorkspaceEvents,
}

impl Workspace {
    /// Builds the workspace from whatever `storage` holds.
    ///
    /// A missing snapshot yields the default workspace. So does a malformed
    /// one, with a warning; it is left in storage until the next commit
    /// replaces it.
    #[instrument(skip_all, fields(backend = %storage.kind()))]
    pub fn open(storage: Arc<dyn StorageAdapter>, config: Config) -> Self {
        let startup = StartupConfig::read(storage.as_ref(), &config);

        let model = if startup.persistence_enabled {
            match WorkspaceModel::load(storage.as_ref(), &config.storage_key, startup.direction) {
                Ok(model) => {
                    info!("Restored workspace from '{}'", config.storage_key);
                    model
                }
                Err(LoadError::Missing) => {
                    debug!("No stored workspace, starting from the default layout");
                    WorkspaceModel::default_with(startup.direction)
                }
                Err(e) => {
                    warn!("Discarding stored workspace: {}", e);
                    WorkspaceModel::default_with(startup.direction)
                }
            }
        } else {
            debug!("Persistence disabled, starting from the default layout");
            WorkspaceModel::default_with(startup.direction)
        };

        let mut cache = RestoreCache::new();
        cache.import_all(model.metadata.restore_data.clone());

        let persistence = Arc::new(PersistenceController::new(
            Arc::clone(&storage),
            &config,
            startup.persistence_enabled,
        ));

        let on = WorkspaceEvents::new();
        let autosave = {
            let persistence = Arc::clone(&persistence);
            Listener::new(&on.model_changed, move |event: &ModelChanged| match event.reason {
                ChangeReason::Reset => {}
                _ => persistence.observe(&event.model),
            })
        };

        Workspace {
            storage,
            sync: StateSynchronizer::new(model.global.direction),
            config,
            model,
            cache,
            pristine: default_layout(),
            persistence,
            _autosave: autosave,
            on,
        }
    }

    pub fn model(&self) -> &WorkspaceModel {
        &self.model
    }

    pub fn layout(&self) -> &LayoutNode {
        &self.model.layout
    }

    pub fn direction(&self) -> Direction {
        self.sync.direction()
    }

    pub fn restore_cache(&self) -> &RestoreCache {
        &self.cache
    }

    pub fn storage_kind(&self) -> AdapterKind {
        self.storage.kind()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn persistence_enabled(&self) -> bool {
        self.persistence.is_enabled()
    }

    /// Whether a commit is waiting for the debounce window to pass.
    pub fn has_pending_commit(&self) -> bool {
        self.persistence.is_pending()
    }

    /// Whether a tab bound to `key` is in the live tree.
    pub fn is_visible(&self, key: &str) -> bool {
        self.model.layout.contains_component(key)
    }

    /// Hides the panel bound to `key` if it is visible, shows it otherwise.
    ///
    /// Hiding remembers a restore entry under `key` before the tab leaves the
    /// tree. Showing looks that entry up (or synthesizes one from the default
    /// layout) and never forgets it, so toggling can be repeated indefinitely.
    #[instrument(skip(self))]
    pub fn toggle_panel(&mut self, key: &str) -> ToggleOutcome {
        if self.is_visible(key) {
            self.hide_panel(key)
        } else {
            self.show_panel(key)
        }
    }

    fn hide_panel(&mut self, key: &str) -> ToggleOutcome {
        let Some(tab_id) = self.model.layout.find_tab_by_component(key).map(|tab| tab.id.clone()) else {
            return ToggleOutcome::UnknownPanel;
        };
        let (layout, entry) = match remove_node(&self.model.layout, &tab_id) {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Cannot hide '{}': {}", key, e);
                return ToggleOutcome::NotRestorable;
            }
        };

        self.cache.remember(key, entry);
        let layout = remove_empty_containers(&layout);
        self.replace_layout(layout);
        self.announce_toggle(key, false);
        ToggleOutcome::Hidden
    }

    fn show_panel(&mut self, key: &str) -> ToggleOutcome {
        if catalog::panel(key).is_none() && self.cache.lookup(key).is_none() {
            debug!("Unknown panel '{}'", key);
            return ToggleOutcome::UnknownPanel;
        }
        let Some(entry) = self.cache.lookup_or_synthesize(key, key, &self.pristine) else {
            debug!("No restore entry for '{}'", key);
            return ToggleOutcome::NotRestorable;
        };
        let Some(layout) = restore_node(&self.model.layout, &entry, &self.pristine) else {
            debug!("Restore entry for '{}' does not fit the current layout", key);
            return ToggleOutcome::NotRestorable;
        };

        self.replace_layout(layout);
        self.announce_toggle(key, true);
        ToggleOutcome::Shown
    }

    /// Sets the reading direction. Returns `false` if it was already set.
    pub fn set_direction(&mut self, direction: Direction) -> bool {
        if !self.sync.set_direction(direction) {
            return false;
        }
        let model = self.model.clone();
        self.replace_model(model, ChangeReason::Direction);
        true
    }

    pub fn toggle_direction(&mut self) -> Direction {
        let next = self.direction().toggled();
        self.set_direction(next);
        next
    }

    /// Deletes the stored snapshot and reinstates the default layout.
    ///
    /// The direction is kept. Nothing is written back until the next change.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        self.persistence.cancel();
        self.storage.remove(&self.config.storage_key);
        self.cache = RestoreCache::new();
        let model = WorkspaceModel::default_with(self.direction());
        self.replace_model(model, ChangeReason::Reset);
        info!("Workspace reset");
    }

    /// Reinstates the default layout without touching storage directly.
    /// Restore entries are kept.
    pub fn reset_layout(&mut self) {
        self.replace_layout(self.pristine.clone());
    }

    /// Stores the flag immediately. Enabling also schedules a commit of the
    /// current model; disabling drops any pending one.
    #[instrument(skip(self))]
    pub fn set_persistence_enabled(&mut self, enabled: bool) {
        self.storage.set(&self.config.enabled_key, &json!(enabled).to_string());
        self.persistence.set_enabled(enabled);
        if enabled {
            self.persistence.observe(&self.model);
        }
    }

    /// Writes a pending commit now. Returns whether anything was written.
    pub fn flush(&self) -> bool {
        self.persistence.flush()
    }

    /// Feeds a model reported by the layout engine through the synchronizer.
    /// Returns `false` for an echo that changes nothing.
    #[instrument(skip_all)]
    pub fn apply_update(&mut self, update: ModelUpdate) -> bool {
        let reconciliation = self.sync.reconcile(&self.model, update, &self.cache);
        let reason = if reconciliation.is_structural() {
            ChangeReason::Layout
        } else {
            ChangeReason::Metadata
        };
        match reconciliation.into_model() {
            Some(model) => {
                self.cache.absorb(model.metadata.restore_data.clone());
                self.replace_model(model, reason);
                true
            }
            None => {
                debug!("Update changed nothing");
                false
            }
        }
    }

    /// Dispatches an action from the engine's action channel.
    ///
    /// Direction changes are intercepted here; they are applied through
    /// [`set_direction`](Self::set_direction) only.
    pub fn handle_action(&mut self, action: LayoutAction) -> Result<ActionOutcome, LayoutError> {
        if StateSynchronizer::intercepts(&action) {
            debug!("Intercepted {:?}", action);
            return Ok(ActionOutcome::Intercepted);
        }

        let applied = match action {
            LayoutAction::SelectTab { node_id, tab_index } => self.select_tab(&node_id, tab_index)?,
            LayoutAction::RemoveNode { node_id, tab_index } => {
                self.close_tab(&node_id, tab_index)?;
                true
            }
            LayoutAction::CloseTabset { node_id } => {
                self.close_tabset(&node_id)?;
                true
            }
            LayoutAction::ChangeDirection { .. } => false,
        };
        Ok(if applied { ActionOutcome::Applied } else { ActionOutcome::Ignored })
    }

    /// Makes tab `index` of `tabset_id` active. Returns `false` if it already was.
    pub fn select_tab(&mut self, tabset_id: &str, index: usize) -> Result<bool, LayoutError> {
        let tabset = self.tabset(tabset_id)?;
        if tabset.selected == Some(index) {
            return Ok(false);
        }
        let layout = update_by_id(&self.model.layout, tabset_id, NodeUpdate::Select(index))?;
        self.replace_layout(layout);
        Ok(true)
    }

    /// Closes tab `index` of `tabset_id`, remembering it under its tab id.
    /// Returns the id of the closed tab.
    #[instrument(skip(self))]
    pub fn close_tab(&mut self, tabset_id: &str, index: usize) -> Result<String, LayoutError> {
        let tab_id = self
            .tabset(tabset_id)?
            .children
            .get(index)
            .map(|tab| tab.id.clone())
            .ok_or_else(|| LayoutError::IndexOutOfRange {
                id: tabset_id.to_string(),
                index,
            })?;

        let (layout, entry) = remove_node(&self.model.layout, &tab_id)?;
        self.cache.remember(tab_id.clone(), entry);
        self.replace_layout(remove_empty_containers(&layout));
        Ok(tab_id)
    }

    /// Closes a whole tabset. Every tab in it is remembered under its tab id,
    /// each entry computed against the layout as it was before the close.
    /// Returns the ids of the closed tabs.
    #[instrument(skip(self))]
    pub fn close_tabset(&mut self, tabset_id: &str) -> Result<Vec<String>, LayoutError> {
        let tabset = self.tabset(tabset_id)?;
        let entries = tabset
            .children
            .iter()
            .filter(|child| child.is_tab())
            .map(|tab| remove_node(&self.model.layout, &tab.id).map(|(_, entry)| (tab.id.clone(), entry)))
            .collect::<Result<Vec<(String, RestoreEntry)>, _>>()?;

        let layout = update_by_id(&self.model.layout, tabset_id, NodeUpdate::Detach)?;
        let closed = entries.iter().map(|(id, _)| id.clone()).collect();
        for (id, entry) in entries {
            self.cache.remember(id, entry);
        }
        self.replace_layout(remove_empty_containers(&layout));
        Ok(closed)
    }

    /// Puts a tab closed by [`close_tab`](Self::close_tab) or
    /// [`close_tabset`](Self::close_tabset) back. Returns `false` if it is
    /// already in the tree.
    pub fn restore_closed(&mut self, tab_id: &str) -> Result<bool, LayoutError> {
        let entry = self
            .cache
            .lookup(tab_id)
            .cloned()
            .ok_or_else(|| LayoutError::NodeNotFound(tab_id.to_string()))?;
        match restore_node(&self.model.layout, &entry, &self.pristine) {
            Some(layout) => {
                self.replace_layout(layout);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn tabset(&self, tabset_id: &str) -> Result<&LayoutNode, LayoutError> {
        let node = find_by_id(&self.model.layout, tabset_id)
            .ok_or_else(|| LayoutError::NodeNotFound(tabset_id.to_string()))?;
        if !node.is_tabset() {
            return Err(LayoutError::NotATabset(tabset_id.to_string()));
        }
        Ok(node)
    }

    fn replace_layout(&mut self, layout: LayoutNode) {
        let model = WorkspaceModel {
            layout,
            ..self.model.clone()
        };
        self.replace_model(model, ChangeReason::Layout);
    }

    // The synchronizer's direction and the cache are authoritative; the model
    // only carries copies of them.
    fn replace_model(&mut self, mut model: WorkspaceModel, reason: ChangeReason) {
        model.global.direction = self.sync.direction();
        model.metadata.restore_data = self.cache.export_all();
        self.model = model;

        let mut event = ModelChanged {
            model: self.model.clone(),
            reason,
        };
        self.on.model_changed.dispatch(&mut event);
    }

    fn announce_toggle(&self, key: &str, visible: bool) {
        let mut event = PanelToggled {
            key: key.to_string(),
            visible,
        };
        self.on.panel_toggled.dispatch(&mut event);
    }
}
