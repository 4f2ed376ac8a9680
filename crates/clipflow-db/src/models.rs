//! Internal Rust models matching the database schema.
//!
//! This module provides the strongly-typed work item record that maps to the
//! `work_items` table. Stage and ID types come from clipflow-common.

use chrono::{DateTime, Utc};
use clipflow_common::{ItemId, MetadataFields, Stage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One video moving through the pipeline.
///
/// The coordinator is the sole writer of `stage`; stage processors only ever
/// hold a transient read-only copy of this struct.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItem {
    pub id: ItemId,
    pub title: String,
    /// Location of the item's current artifact. Updated by each stage that
    /// produces a new file (processing writes a transcoded copy).
    pub source_path: PathBuf,
    pub stage: Stage,
    /// Populated once the metadata stage completes; `None` before that.
    pub metadata: Option<MetadataFields>,
    /// Failure reason; only set while the item is in `Failed`.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    /// Create a freshly downloaded item. The id is assigned here and stays
    /// stable for the item's lifetime.
    pub fn new(title: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            id: ItemId::new(),
            title: title.into(),
            source_path: source_path.into(),
            stage: Stage::Downloaded,
            metadata: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the item forward to `stage`, optionally swapping in a new
    /// artifact path. Legality is the coordinator's concern, not checked here.
    pub fn advance(&mut self, stage: Stage, new_path: Option<&Path>) {
        self.stage = stage;
        if let Some(path) = new_path {
            self.source_path = path.to_path_buf();
        }
        self.updated_at = Utc::now();
    }

    /// Attach metadata fields produced by the metadata generator.
    pub fn set_metadata(&mut self, fields: MetadataFields) {
        self.metadata = Some(fields);
        self.updated_at = Utc::now();
    }

    /// Force the item into `Failed`, recording the reason.
    pub fn fail(&mut self, reason: &str) {
        self.stage = Stage::Failed;
        self.error = Some(reason.to_string());
        self.updated_at = Utc::now();
    }

    /// Reset a failed item to `stage`, clearing the failure reason.
    pub fn requeue(&mut self, stage: Stage) {
        self.stage = stage;
        self.error = None;
        self.updated_at = Utc::now();
    }
}
