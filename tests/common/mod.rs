//! Shared helpers for coordinator integration tests.

use clipflow::coordinator::Coordinator;
use clipflow_db::pool::{init_pool, DbPool};
use std::sync::Arc;
use tempfile::TempDir;

/// Open a coordinator over a fresh on-disk database in a temp directory.
///
/// The TempDir must be kept alive for the duration of the test; dropping it
/// deletes the database file.
pub fn open_test_coordinator() -> (TempDir, Arc<Coordinator>) {
    let dir = TempDir::new().unwrap();
    let coordinator = open_at(&dir);
    (dir, coordinator)
}

/// Open (or re-open) a coordinator over the database inside `dir`.
pub fn open_at(dir: &TempDir) -> Arc<Coordinator> {
    Coordinator::open(pool_at(dir), 64).unwrap()
}

pub fn pool_at(dir: &TempDir) -> DbPool {
    let db_path = dir.path().join("clipflow.db");
    init_pool(&db_path.to_string_lossy()).unwrap()
}
