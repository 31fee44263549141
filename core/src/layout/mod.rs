//! The layout tree: rows, columns, tabsets and tabs.
//!
//! This module is the layout engine the persistence layer is built against. It
//! deliberately exposes a narrow surface:
//!
//! *   **Construction:** [`row`], [`column`], [`tabset`] and [`tab`] build nodes.
//! *   **Search and update:** [`find_by_id`], [`update_by_id`] and
//!     [`remove_empty_containers`].
//! *   **Removal with restore data:** [`remove_node`] detaches a tab and returns a
//!     [`RestoreEntry`] describing where it lived; [`restore_node`] puts it back,
//!     recreating its tabset if that has since been pruned.
//! *   **Actions:** [`LayoutAction`] describes the structural edits the engine
//!     reports (tab selection, tab close, tabset close, direction change).
//!
//! All operations are pure: they take a tree by reference and return a new one,
//! so the caller decides when an edit becomes the live state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod action;
mod ops;

pub use self::action::LayoutAction;
pub use self::ops::{
    find_by_id, find_path, remove_empty_containers, remove_node, restore_node, update_by_id,
    NodeUpdate, PathSegment, RestoreEntry,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node is not a tab: {0}")]
    NotATab(String),

    #[error("Node is not a tabset: {0}")]
    NotATabset(String),

    #[error("Node '{id}' has no child at index {index}")]
    IndexOutOfRange { id: String, index: usize },

    #[error("The root node cannot be detached: {0}")]
    CannotDetachRoot(String),
}

/// Reading direction of the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl Direction {
    pub fn toggled(self) -> Self {
        match self {
            Direction::Ltr => Direction::Rtl,
            Direction::Rtl => Direction::Ltr,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown direction '{0}' (expected 'ltr' or 'rtl')")]
pub struct ParseDirectionError(String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ltr" | "left-to-right" => Ok(Direction::Ltr),
            "rtl" | "right-to-left" => Ok(Direction::Rtl),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Row,
    Column,
    Tabset,
    Tab,
}

/// A node of the layout tree.
///
/// Equality is deep and structural: two trees compare equal when every node,
/// including tab selection and child order, matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Component key bound to a tab.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Index of the active tab (tabsets only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayoutNode>,
}

impl LayoutNode {
    pub fn is_tab(&self) -> bool {
        self.kind == NodeKind::Tab
    }

    pub fn is_tabset(&self) -> bool {
        self.kind == NodeKind::Tabset
    }

    /// Rows and columns; the nodes that hold tabsets or other containers.
    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Row | NodeKind::Column)
    }

    /// Returns the first tab bound to `component`, searching depth-first.
    pub fn find_tab_by_component(&self, component: &str) -> Option<&LayoutNode> {
        if self.is_tab() && self.component.as_deref() == Some(component) {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_tab_by_component(component))
    }

    pub fn contains_component(&self, component: &str) -> bool {
        self.find_tab_by_component(component).is_some()
    }

    /// All tabs in the tree, in depth-first order.
    pub fn tabs(&self) -> Vec<&LayoutNode> {
        let mut out = Vec::new();
        self.collect_tabs(&mut out);
        out
    }

    fn collect_tabs<'a>(&'a self, out: &mut Vec<&'a LayoutNode>) {
        if self.is_tab() {
            out.push(self);
        }
        for child in &self.children {
            child.collect_tabs(out);
        }
    }

    pub(crate) fn find_mut(&mut self, id: &str) -> Option<&mut LayoutNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    // Keeps `selected` pointing at a sensible tab after the child at `removed` is gone.
    pub(crate) fn fix_selection_after_removal(&mut self, removed: usize) {
        let Some(selected) = self.selected else {
            return;
        };
        if self.children.is_empty() {
            self.selected = if self.is_tabset() { Some(0) } else { None };
            return;
        }
        let shifted = if selected > removed { selected - 1 } else { selected };
        self.selected = Some(shifted.min(self.children.len() - 1));
    }
}

fn container(id: impl Into<String>, kind: NodeKind, children: Vec<LayoutNode>) -> LayoutNode {
    LayoutNode {
        id: id.into(),
        kind,
        name: None,
        component: None,
        selected: None,
        children,
    }
}

pub fn row(id: impl Into<String>, children: Vec<LayoutNode>) -> LayoutNode {
    container(id, NodeKind::Row, children)
}

pub fn column(id: impl Into<String>, children: Vec<LayoutNode>) -> LayoutNode {
    container(id, NodeKind::Column, children)
}

/// Creates a tabset with its first tab selected.
pub fn tabset(id: impl Into<String>, tabs: Vec<LayoutNode>) -> LayoutNode {
    LayoutNode {
        selected: Some(0),
        ..container(id, NodeKind::Tabset, tabs)
    }
}

pub fn tab(id: impl Into<String>, component: impl Into<String>, name: impl Into<String>) -> LayoutNode {
    LayoutNode {
        id: id.into(),
        kind: NodeKind::Tab,
        name: Some(name.into()),
        component: Some(component.into()),
        selected: None,
        children: Vec::new(),
    }
}
