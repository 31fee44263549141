use serde::{Deserialize, Serialize};

use super::Direction;

/// Structural edits reported by the layout engine's action channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LayoutAction {
    /// A tab header was clicked.
    SelectTab { node_id: String, tab_index: usize },
    /// The close button of the tab at `tab_index` inside tabset `node_id` was pressed.
    RemoveNode { node_id: String, tab_index: usize },
    /// A whole tabset was closed.
    CloseTabset { node_id: String },
    ChangeDirection { direction: Direction },
}

impl LayoutAction {
    /// The node the action targets, if any.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            LayoutAction::SelectTab { node_id, .. }
            | LayoutAction::RemoveNode { node_id, .. }
            | LayoutAction::CloseTabset { node_id } => Some(node_id),
            LayoutAction::ChangeDirection { .. } => None,
        }
    }
}
