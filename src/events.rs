//! Coordinator events broadcast to stage processors and observers.
//!
//! The coordinator emits an event after every durable state change. Stage
//! processors subscribe and react to completions of the stage before them,
//! so the pipeline wires itself together through the channel rather than
//! through direct references between processors.

use clipflow_common::{ItemId, Stage};
use clipflow_db::models::WorkItem;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Event emitted by the coordinator after a committed state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// An item advanced to a new stage. Carries everything the next stage
    /// processor needs to pick the item up.
    StageAdvanced {
        id: ItemId,
        stage: Stage,
        title: String,
        source_path: PathBuf,
    },
    /// An item was forced into `Failed`.
    ItemFailed { id: ItemId, reason: String },
    /// A failed item was reset to an earlier stage.
    ItemRequeued { id: ItemId, stage: Stage },
    /// All item records were removed.
    ItemsCleared { removed: usize },
}

impl PipelineEvent {
    /// Create a StageAdvanced event from the item's committed state.
    pub fn stage_advanced(item: &WorkItem) -> Self {
        PipelineEvent::StageAdvanced {
            id: item.id,
            stage: item.stage,
            title: item.title.clone(),
            source_path: item.source_path.clone(),
        }
    }

    /// Create an ItemFailed event.
    pub fn item_failed(id: ItemId, reason: String) -> Self {
        PipelineEvent::ItemFailed { id, reason }
    }

    /// Create an ItemRequeued event.
    pub fn item_requeued(id: ItemId, stage: Stage) -> Self {
        PipelineEvent::ItemRequeued { id, stage }
    }

    /// Create an ItemsCleared event.
    pub fn items_cleared(removed: usize) -> Self {
        PipelineEvent::ItemsCleared { removed }
    }
}
