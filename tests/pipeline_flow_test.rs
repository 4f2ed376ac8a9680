//! Integration tests for the forward pipeline flow.

mod common;

use assert_matches::assert_matches;
use clipflow::coordinator::{ReportOutcome, StageReport};
use clipflow_common::{Error, ItemId, MetadataFields, Stage};
use common::open_test_coordinator;
use std::path::PathBuf;
use std::sync::Arc;

fn download(title: &str, path: &str) -> StageReport {
    StageReport::Download {
        title: title.to_string(),
        path: PathBuf::from(path),
    }
}

fn metadata_fields(tags: &[&str]) -> MetadataFields {
    let mut fields = MetadataFields::new();
    fields.insert("tags".into(), serde_json::json!(tags));
    fields
}

#[test]
fn full_pipeline_scenario() {
    let (_dir, coordinator) = open_test_coordinator();

    // Download creates the item
    let outcome = coordinator
        .report_stage_complete(download("Cat video", "/videos/a.mp4"))
        .unwrap();
    let item = outcome.applied().unwrap().clone();
    assert_eq!(item.stage, Stage::Downloaded);
    assert_eq!(item.title, "Cat video");

    // Process completion advances and swaps the artifact
    let outcome = coordinator
        .report_stage_complete(StageReport::Process {
            id: item.id,
            path: PathBuf::from("/videos/a_processed.mp4"),
        })
        .unwrap();
    let item = outcome.applied().unwrap().clone();
    assert_eq!(item.stage, Stage::Processed);
    assert_eq!(item.source_path, PathBuf::from("/videos/a_processed.mp4"));

    // Metadata completion attaches fields
    let outcome = coordinator
        .report_stage_complete(StageReport::Metadata {
            id: item.id,
            fields: metadata_fields(&["cat"]),
        })
        .unwrap();
    let item = outcome.applied().unwrap().clone();
    assert_eq!(item.stage, Stage::MetadataReady);

    // Upload completion is legal straight from MetadataReady
    let outcome = coordinator
        .report_stage_complete(StageReport::Upload { id: item.id })
        .unwrap();
    assert_eq!(outcome.applied().unwrap().stage, Stage::Uploaded);

    // Final snapshot: one item, uploaded, metadata intact
    let snapshot = coordinator.get_snapshot(None);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].stage, Stage::Uploaded);
    let metadata = snapshot[0].metadata.as_ref().unwrap();
    assert_eq!(metadata["tags"], serde_json::json!(["cat"]));
}

#[test]
fn out_of_order_report_is_a_noop() {
    let (_dir, coordinator) = open_test_coordinator();

    let item = coordinator
        .report_stage_complete(download("Cat video", "/videos/a.mp4"))
        .unwrap()
        .applied()
        .unwrap()
        .clone();

    // Metadata before process: ignored, stage unchanged
    let outcome = coordinator
        .report_stage_complete(StageReport::Metadata {
            id: item.id,
            fields: metadata_fields(&["cat"]),
        })
        .unwrap();
    assert_matches!(
        outcome,
        ReportOutcome::Ignored {
            current: Stage::Downloaded,
            reported: Stage::MetadataReady,
            ..
        }
    );

    let snapshot = coordinator.get_snapshot(None);
    assert_eq!(snapshot[0].stage, Stage::Downloaded);
    assert!(snapshot[0].metadata.is_none());
}

#[test]
fn stage_never_skips_forward() {
    let (_dir, coordinator) = open_test_coordinator();

    let item = coordinator
        .report_stage_complete(download("Cat video", "/videos/a.mp4"))
        .unwrap()
        .applied()
        .unwrap()
        .clone();

    // Upload straight from Downloaded: ignored
    let outcome = coordinator
        .report_stage_complete(StageReport::Upload { id: item.id })
        .unwrap();
    assert_matches!(outcome, ReportOutcome::Ignored { .. });

    // Duplicate process reports: first applies, second is ignored
    let process = StageReport::Process {
        id: item.id,
        path: PathBuf::from("/videos/a_processed.mp4"),
    };
    assert_matches!(
        coordinator.report_stage_complete(process.clone()).unwrap(),
        ReportOutcome::Applied(_)
    );
    assert_matches!(
        coordinator.report_stage_complete(process).unwrap(),
        ReportOutcome::Ignored {
            current: Stage::Processed,
            reported: Stage::Processed,
            ..
        }
    );
}

#[test]
fn unknown_item_report_is_not_found() {
    let (_dir, coordinator) = open_test_coordinator();

    let err = coordinator
        .report_stage_complete(StageReport::Process {
            id: ItemId::new(),
            path: PathBuf::from("/videos/ghost.mp4"),
        })
        .unwrap_err();
    assert_matches!(err, Error::NotFound(_));

    // No record was created
    assert!(coordinator.get_snapshot(None).is_empty());
}

#[test]
fn duplicate_download_report_does_not_create_a_second_item() {
    let (_dir, coordinator) = open_test_coordinator();

    coordinator
        .report_stage_complete(download("Cat video", "/videos/a.mp4"))
        .unwrap();

    // Same title reported again (e.g. a retry): matched and ignored
    let outcome = coordinator
        .report_stage_complete(download("Cat video", "/videos/a.mp4"))
        .unwrap();
    assert_matches!(outcome, ReportOutcome::Ignored { .. });
    assert_eq!(coordinator.get_snapshot(None).len(), 1);
}

#[test]
fn ambiguous_download_match_creates_a_new_item() {
    let (_dir, coordinator) = open_test_coordinator();

    coordinator
        .report_stage_complete(download("Cat video", "/videos/clip.mp4"))
        .unwrap();
    coordinator
        .report_stage_complete(download("Other", "/videos/cl.mp4"))
        .unwrap();

    // Matches "Cat video" by title and "Other" by filename prefix ("cl"):
    // two candidates, so a fresh item is created instead of guessing.
    let outcome = coordinator
        .report_stage_complete(download("Cat video", "/videos/cl_new.mp4"))
        .unwrap();
    assert_matches!(outcome, ReportOutcome::Applied(_));
    assert_eq!(coordinator.get_snapshot(None).len(), 3);
}

#[test]
fn in_flight_markers() {
    let (_dir, coordinator) = open_test_coordinator();

    let item = coordinator
        .report_stage_complete(download("Cat video", "/videos/a.mp4"))
        .unwrap()
        .applied()
        .unwrap()
        .clone();

    // Process start sets the marker
    let outcome = coordinator
        .report_stage_started(item.id, Stage::Processing)
        .unwrap();
    assert_eq!(outcome.applied().unwrap().stage, Stage::Processing);

    // Completion from the marker
    coordinator
        .report_stage_complete(StageReport::Process {
            id: item.id,
            path: PathBuf::from("/videos/a_processed.mp4"),
        })
        .unwrap();
    coordinator
        .report_stage_complete(StageReport::Metadata {
            id: item.id,
            fields: metadata_fields(&["cat"]),
        })
        .unwrap();

    // Upload enqueue, then completion from Queued
    let outcome = coordinator
        .report_stage_started(item.id, Stage::Queued)
        .unwrap();
    assert_eq!(outcome.applied().unwrap().stage, Stage::Queued);
    let outcome = coordinator
        .report_stage_complete(StageReport::Upload { id: item.id })
        .unwrap();
    assert_eq!(outcome.applied().unwrap().stage, Stage::Uploaded);
}

#[test]
fn stage_start_validation() {
    let (_dir, coordinator) = open_test_coordinator();

    let item = coordinator
        .report_stage_complete(download("Cat video", "/videos/a.mp4"))
        .unwrap()
        .applied()
        .unwrap()
        .clone();

    // Only in-flight markers are accepted
    let err = coordinator
        .report_stage_started(item.id, Stage::Uploaded)
        .unwrap_err();
    assert_matches!(err, Error::InvalidInput(_));

    // Queued straight from Downloaded is out of order
    let outcome = coordinator
        .report_stage_started(item.id, Stage::Queued)
        .unwrap();
    assert_matches!(outcome, ReportOutcome::Ignored { .. });

    // Unknown item
    let err = coordinator
        .report_stage_started(ItemId::new(), Stage::Processing)
        .unwrap_err();
    assert_matches!(err, Error::NotFound(_));
}

#[test]
fn distinct_items_do_not_interfere() {
    let (_dir, coordinator) = open_test_coordinator();

    let a = coordinator
        .report_stage_complete(download("Cat video", "/videos/a.mp4"))
        .unwrap()
        .applied()
        .unwrap()
        .clone();
    let b = coordinator
        .report_stage_complete(download("Dog video", "/videos/b.mp4"))
        .unwrap()
        .applied()
        .unwrap()
        .clone();

    // Drive each item through its remaining stages from its own thread
    let drive = |id, processed: &str, tag: &str| {
        let coordinator = Arc::clone(&coordinator);
        let processed = PathBuf::from(processed);
        let fields = metadata_fields(&[tag]);
        std::thread::spawn(move || {
            coordinator
                .report_stage_complete(StageReport::Process {
                    id,
                    path: processed,
                })
                .unwrap();
            coordinator
                .report_stage_complete(StageReport::Metadata { id, fields })
                .unwrap();
            coordinator
                .report_stage_complete(StageReport::Upload { id })
                .unwrap();
        })
    };
    let drive_a = drive(a.id, "/videos/a_processed.mp4", "cat");
    let drive_b = drive(b.id, "/videos/b_processed.mp4", "dog");
    drive_a.join().unwrap();
    drive_b.join().unwrap();

    let snapshot = coordinator.get_snapshot(None);
    let item_a = snapshot.iter().find(|i| i.id == a.id).unwrap();
    let item_b = snapshot.iter().find(|i| i.id == b.id).unwrap();
    assert_eq!(item_a.stage, Stage::Uploaded);
    assert_eq!(item_b.stage, Stage::Uploaded);
    assert_eq!(item_a.source_path, PathBuf::from("/videos/a_processed.mp4"));
    assert_eq!(item_b.source_path, PathBuf::from("/videos/b_processed.mp4"));
    assert_eq!(
        item_a.metadata.as_ref().unwrap()["tags"],
        serde_json::json!(["cat"])
    );
    assert_eq!(
        item_b.metadata.as_ref().unwrap()["tags"],
        serde_json::json!(["dog"])
    );
}

#[test]
fn snapshot_filter_and_counts() {
    let (_dir, coordinator) = open_test_coordinator();

    let a = coordinator
        .report_stage_complete(download("A", "/videos/a.mp4"))
        .unwrap()
        .applied()
        .unwrap()
        .clone();
    coordinator
        .report_stage_complete(download("B", "/videos/b.mp4"))
        .unwrap();

    coordinator
        .report_stage_started(a.id, Stage::Processing)
        .unwrap();

    let processing = coordinator.get_snapshot(Some(Stage::Processing));
    assert_eq!(processing.len(), 1);
    assert_eq!(processing[0].id, a.id);

    let counts = coordinator.stage_counts();
    assert_eq!(counts.get(&Stage::Processing), Some(&1));
    assert_eq!(counts.get(&Stage::Downloaded), Some(&1));
    assert_eq!(counts.values().sum::<usize>(), 2);
}
