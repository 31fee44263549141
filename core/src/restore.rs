use std::collections::BTreeMap;

use tracing::debug;

use crate::layout::{remove_node, LayoutNode, RestoreEntry};

/// Restore entries for removed panels.
///
/// Entries are keyed by component key when a panel was toggled off and by tab
/// id when a tab was closed directly. The cache only grows: remembering a key
/// replaces its entry and restoring a panel never forgets it, so the same panel
/// can be hidden and shown any number of times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreCache {
    entries: BTreeMap<String, RestoreEntry>,
}

impl RestoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, key: impl Into<String>, entry: RestoreEntry) {
        let key = key.into();
        debug!("Remembering restore entry for '{}' (tabset {})", key, entry.tabset_id);
        self.entries.insert(key, entry);
    }

    pub fn lookup(&self, key: &str) -> Option<&RestoreEntry> {
        self.entries.get(key)
    }

    pub fn forget(&mut self, key: &str) -> Option<RestoreEntry> {
        self.entries.remove(key)
    }

    pub fn export_all(&self) -> BTreeMap<String, RestoreEntry> {
        self.entries.clone()
    }

    /// Replaces the whole cache.
    pub fn import_all(&mut self, entries: BTreeMap<String, RestoreEntry>) {
        self.entries = entries;
    }

    /// Merges `entries` in, overwriting keys that already exist.
    pub fn absorb(&mut self, entries: BTreeMap<String, RestoreEntry>) {
        self.entries.extend(entries);
    }

    /// Returns the entry for `key`, or builds one by removing the tab bound to
    /// `component` from a throwaway copy of `pristine`.
    ///
    /// A synthesized entry is remembered under `key`.
    pub fn lookup_or_synthesize(&mut self, key: &str, component: &str, pristine: &LayoutNode) -> Option<RestoreEntry> {
        if let Some(entry) = self.entries.get(key) {
            return Some(entry.clone());
        }

        let tab_id = pristine.find_tab_by_component(component)?.id.clone();
        let (_, entry) = remove_node(pristine, &tab_id).ok()?;
        debug!("Synthesized restore entry for '{}' from the default layout", key);
        self.entries.insert(key.to_string(), entry.clone());
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
