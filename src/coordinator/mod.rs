//! The pipeline coordinator: single source of truth for work item state.
//!
//! External stage processors (download engine, encoder, metadata generator,
//! upload scheduler) report stage completions here. The coordinator validates
//! the transition against the pipeline order, persists the updated item, and
//! broadcasts a stage-advanced event that the next stage processor consumes.
//!
//! Reports are serialized through a write lock, and the durable write happens
//! before the in-memory map is updated and before the event goes out. A
//! snapshot therefore never observes a half-applied item, and a subscriber
//! that reacts to an event by snapshotting sees the committed change.

mod matching;

use clipflow_common::{Error, ItemId, MetadataFields, Result, Stage};
use clipflow_db::models::WorkItem;
use clipflow_db::pool::{get_conn, DbPool};
use clipflow_db::queries::work_items;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::events::PipelineEvent;

/// A stage processor's completion report.
///
/// Only the download report identifies its item by source data; it is the
/// creation point, so no id exists yet. Every later stage carries the item id
/// it received from the stage-advanced event, rather than re-deriving
/// identity from filenames.
#[derive(Debug, Clone)]
pub enum StageReport {
    /// Download engine acquired a clip. Creates the item if no known item
    /// matches the title/path heuristic.
    Download { title: String, path: PathBuf },
    /// Process engine wrote the transcoded artifact.
    Process { id: ItemId, path: PathBuf },
    /// Metadata generator produced the upload fields.
    Metadata { id: ItemId, fields: MetadataFields },
    /// Upload scheduler finished the upload.
    Upload { id: ItemId },
}

impl StageReport {
    /// The stage a successful application of this report lands the item in.
    pub fn completed_stage(&self) -> Stage {
        match self {
            StageReport::Download { .. } => Stage::Downloaded,
            StageReport::Process { .. } => Stage::Processed,
            StageReport::Metadata { .. } => Stage::MetadataReady,
            StageReport::Upload { .. } => Stage::Uploaded,
        }
    }
}

/// Result of applying a stage report.
#[derive(Debug, Clone)]
pub enum ReportOutcome {
    /// The transition was applied and persisted.
    Applied(WorkItem),
    /// The report was out of order or a duplicate; nothing changed.
    Ignored {
        id: ItemId,
        current: Stage,
        reported: Stage,
    },
}

impl ReportOutcome {
    /// The updated item, if the report was applied.
    pub fn applied(&self) -> Option<&WorkItem> {
        match self {
            ReportOutcome::Applied(item) => Some(item),
            ReportOutcome::Ignored { .. } => None,
        }
    }
}

/// Owns the authoritative copy of every work item and sequences stage
/// transitions. Exactly one coordinator instance writes item state.
pub struct Coordinator {
    items: RwLock<HashMap<ItemId, WorkItem>>,
    pool: DbPool,
    event_tx: broadcast::Sender<PipelineEvent>,
}

impl Coordinator {
    /// Open the coordinator over an initialized database pool.
    ///
    /// Items left in an in-flight marker by a previous session are settled
    /// back to the preceding stable stage, then the full item set is loaded
    /// into memory.
    pub fn open(pool: DbPool, channel_capacity: usize) -> Result<Arc<Self>> {
        let (event_tx, _) = broadcast::channel(channel_capacity);

        let conn = get_conn(&pool)?;
        let reset = work_items::reset_in_flight(&conn)?;
        if reset > 0 {
            tracing::info!("Settled {} in-flight items from a previous session", reset);
        }

        let items = work_items::list_items(&conn, None)?
            .into_iter()
            .map(|item| (item.id, item))
            .collect::<HashMap<_, _>>();
        drop(conn);

        tracing::debug!("Coordinator loaded {} work items", items.len());

        Ok(Arc::new(Self {
            items: RwLock::new(items),
            pool,
            event_tx,
        }))
    }

    /// Subscribe to coordinator events.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.event_tx.subscribe()
    }

    fn broadcast(&self, event: PipelineEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!("No subscribers for event");
        }
    }

    fn persist(&self, item: &WorkItem) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        work_items::upsert_item(&conn, item)
    }

    /// Apply a stage completion report.
    ///
    /// A download report for an unmatched source creates the item. For known
    /// items the transition is applied only if it follows the item's current
    /// stage; an out-of-order or duplicate report is logged and ignored, not
    /// an error. The durable write happens before anything else observes the
    /// change; if it fails, in-memory state is untouched and the error
    /// propagates so the processor can retry.
    pub fn report_stage_complete(&self, report: StageReport) -> Result<ReportOutcome> {
        match report {
            StageReport::Download { title, path } => self.apply_download(title, path),
            StageReport::Process { id, path } => {
                self.apply_transition(id, Stage::Processed, Some(path), None)
            }
            StageReport::Metadata { id, fields } => {
                self.apply_transition(id, Stage::MetadataReady, None, Some(fields))
            }
            StageReport::Upload { id } => self.apply_transition(id, Stage::Uploaded, None, None),
        }
    }

    /// Record that a stage processor has started work on an item, setting the
    /// `Processing` or `Queued` in-flight marker. Same legality rules as
    /// completion reports: an out-of-order start is a logged no-op.
    pub fn report_stage_started(&self, id: ItemId, marker: Stage) -> Result<ReportOutcome> {
        if !marker.is_in_flight() {
            return Err(Error::invalid_input(format!(
                "{} is not an in-flight marker",
                marker
            )));
        }
        self.apply_transition(id, marker, None, None)
    }

    fn apply_download(&self, title: String, path: PathBuf) -> Result<ReportOutcome> {
        let mut items = self.items.write();

        let candidates = matching::find_candidates(items.values(), &title, &path);
        if candidates.len() == 1 {
            // Already tracked: a repeated download report never re-applies.
            let existing = candidates[0];
            let (id, current) = (existing.id, existing.stage);
            tracing::warn!(%id, %current, title, "Duplicate download report ignored");
            return Ok(ReportOutcome::Ignored {
                id,
                current,
                reported: Stage::Downloaded,
            });
        }
        if candidates.len() > 1 {
            tracing::warn!(
                title,
                candidates = candidates.len(),
                "Ambiguous download match, creating a new item"
            );
        }

        let item = WorkItem::new(title, path);
        self.persist(&item)?;
        items.insert(item.id, item.clone());
        tracing::info!(id = %item.id, title = %item.title, "Created work item");
        self.broadcast(PipelineEvent::stage_advanced(&item));

        Ok(ReportOutcome::Applied(item))
    }

    fn apply_transition(
        &self,
        id: ItemId,
        target: Stage,
        new_path: Option<PathBuf>,
        fields: Option<MetadataFields>,
    ) -> Result<ReportOutcome> {
        let mut items = self.items.write();
        let item = match items.get(&id) {
            Some(item) => item,
            None => {
                tracing::warn!(%id, stage = %target, "Stage report for unknown item");
                return Err(Error::not_found(id.to_string()));
            }
        };

        let current = item.stage;
        if !current.can_advance_to(target) {
            tracing::warn!(%id, %current, reported = %target, "Out-of-order stage report ignored");
            return Ok(ReportOutcome::Ignored {
                id,
                current,
                reported: target,
            });
        }

        let mut updated = item.clone();
        if let Some(fields) = fields {
            updated.set_metadata(fields);
        }
        updated.advance(target, new_path.as_deref());

        self.persist(&updated)?;
        items.insert(id, updated.clone());
        tracing::info!(%id, stage = %updated.stage, "Stage advanced");
        self.broadcast(PipelineEvent::stage_advanced(&updated));

        Ok(ReportOutcome::Applied(updated))
    }

    /// Force an item into `Failed`, recording the reason. Legal from any
    /// stage except `Uploaded`; failing an already-failed item updates the
    /// recorded reason.
    pub fn mark_failed(&self, id: ItemId, reason: &str) -> Result<WorkItem> {
        let mut items = self.items.write();
        let item = items
            .get(&id)
            .ok_or_else(|| Error::not_found(id.to_string()))?;

        if item.stage == Stage::Uploaded {
            return Err(Error::invalid_input("cannot fail an uploaded item"));
        }

        let mut updated = item.clone();
        updated.fail(reason);
        self.persist(&updated)?;
        items.insert(id, updated.clone());
        tracing::warn!(%id, reason, "Item failed");
        self.broadcast(PipelineEvent::item_failed(id, reason.to_string()));

        Ok(updated)
    }

    /// Reset a failed item to exactly `target`, clearing the failure reason.
    /// Subsequent legal transitions from `target` proceed normally.
    pub fn requeue(&self, id: ItemId, target: Stage) -> Result<WorkItem> {
        if target == Stage::Failed {
            return Err(Error::invalid_input("cannot requeue an item to failed"));
        }

        let mut items = self.items.write();
        let item = items
            .get(&id)
            .ok_or_else(|| Error::not_found(id.to_string()))?;

        if item.stage != Stage::Failed {
            return Err(Error::invalid_input(format!(
                "only failed items can be requeued (item is {})",
                item.stage
            )));
        }

        let mut updated = item.clone();
        updated.requeue(target);
        self.persist(&updated)?;
        items.insert(id, updated.clone());
        tracing::info!(%id, stage = %target, "Item requeued");
        self.broadcast(PipelineEvent::item_requeued(id, target));

        Ok(updated)
    }

    /// Delete every work item record. Irreversible; artifacts on disk are
    /// untouched. Confirmation belongs to the caller boundary.
    pub fn clear_all(&self) -> Result<usize> {
        let mut items = self.items.write();
        let conn = get_conn(&self.pool)?;
        let removed = work_items::delete_all(&conn)?;
        items.clear();
        tracing::info!(removed, "Cleared all work items");
        self.broadcast(PipelineEvent::items_cleared(removed));

        Ok(removed)
    }

    /// Current list of all work items, optionally filtered by stage, in
    /// creation order.
    pub fn get_snapshot(&self, filter: Option<Stage>) -> Vec<WorkItem> {
        let items = self.items.read();
        let mut snapshot: Vec<WorkItem> = items
            .values()
            .filter(|item| filter.map_or(true, |stage| item.stage == stage))
            .cloned()
            .collect();
        snapshot.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.to_string().cmp(&b.id.to_string()))
        });
        snapshot
    }

    /// Item count per stage, derived from the authoritative item list.
    pub fn stage_counts(&self) -> BTreeMap<Stage, usize> {
        let items = self.items.read();
        let mut counts = BTreeMap::new();
        for item in items.values() {
            *counts.entry(item.stage).or_insert(0) += 1;
        }
        counts
    }
}
