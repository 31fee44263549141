//! Reconciliation of engine-reported updates with locally tracked state.
//!
//! The layout engine reports a fresh model after every user edit, and also
//! echoes back models the workspace itself pushed into it. The synchronizer
//! decides what the canonical model becomes so that echoes never produce
//! another round of updates:
//!
//! 1.  A direction carried by the update and different from the tracked one is
//!     adopted. An update without a direction leaves the tracked one alone.
//! 2.  If the tree is structurally unchanged, the previous tree is kept and only
//!     the metadata is merged. If nothing at all changes, the update is
//!     [`Reconciliation::Unchanged`] and must not be written anywhere.
//! 3.  If the tree changed, it is adopted with the tracked direction and the
//!     tracked restore data re-attached.
//!
//! Direction-change actions never reach this path; see
//! [`StateSynchronizer::intercepts`].

use tracing::debug;

use crate::layout::{Direction, LayoutAction};
use crate::model::{GlobalSettings, ModelMetadata, ModelUpdate, WorkspaceModel};
use crate::restore::RestoreCache;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Nothing observable changed.
    Unchanged,
    /// Same tree, new settings or restore data.
    MetadataOnly(WorkspaceModel),
    /// A different tree.
    Structural(WorkspaceModel),
}

impl Reconciliation {
    pub fn into_model(self) -> Option<WorkspaceModel> {
        match self {
            Reconciliation::Unchanged => None,
            Reconciliation::MetadataOnly(model) | Reconciliation::Structural(model) => Some(model),
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, Reconciliation::Structural(_))
    }
}

/// Sole owner of the tracked reading direction.
#[derive(Debug, Clone)]
pub struct StateSynchronizer {
    direction: Direction,
}

impl StateSynchronizer {
    pub fn new(direction: Direction) -> Self {
        StateSynchronizer { direction }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Records an explicit direction change. Returns `false` if it was already set.
    pub fn set_direction(&mut self, direction: Direction) -> bool {
        if self.direction == direction {
            return false;
        }
        debug!("Direction {} -> {}", self.direction, direction);
        self.direction = direction;
        true
    }

    /// Direction changes are applied through [`set_direction`](Self::set_direction)
    /// only. Forwarding them as generic updates would feed the engine's echo of
    /// the change back into it.
    pub fn intercepts(action: &LayoutAction) -> bool {
        matches!(action, LayoutAction::ChangeDirection { .. })
    }

    pub fn reconcile(&mut self, previous: &WorkspaceModel, update: ModelUpdate, tracked: &RestoreCache) -> Reconciliation {
        if let Some(direction) = update.global.direction {
            if direction != self.direction {
                debug!("Adopting direction {} from update", direction);
                self.direction = direction;
            }
        }

        let global = GlobalSettings {
            direction: self.direction,
            splitter_size: update.global.splitter_size.unwrap_or(previous.global.splitter_size),
        };

        if update.layout == previous.layout {
            let mut restore_data = previous.metadata.restore_data.clone();
            if let Some(incoming) = update.metadata.restore_data {
                restore_data.extend(incoming);
            }
            let next = WorkspaceModel {
                global,
                layout: previous.layout.clone(),
                metadata: ModelMetadata {
                    restore_data,
                    written_by: update.metadata.written_by.or_else(|| previous.metadata.written_by.clone()),
                },
            };
            if &next == previous {
                return Reconciliation::Unchanged;
            }
            return Reconciliation::MetadataOnly(next);
        }

        // Tabs moved by drag and drop keep their restore entries.
        let restore_data = if tracked.is_empty() {
            update.metadata.restore_data.unwrap_or_default()
        } else {
            tracked.export_all()
        };
        Reconciliation::Structural(WorkspaceModel {
            global,
            layout: update.layout,
            metadata: ModelMetadata {
                restore_data,
                written_by: update.metadata.written_by,
            },
        })
    }
}
