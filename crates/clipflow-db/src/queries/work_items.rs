//! Work item query operations.
//!
//! This module provides the durable record operations the coordinator relies
//! on: atomic single-row upsert, lookup, listing by stage, bulk clear, and
//! the startup reset of in-flight markers.

use chrono::{DateTime, Utc};
use clipflow_common::{Error, ItemId, Result, Stage};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::models::WorkItem;

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<WorkItem> {
    let id = Uuid::parse_str(&row.get::<_, String>(0)?)
        .map(ItemId::from)
        .map_err(|e| conversion_error(0, e))?;
    let stage: Stage = row
        .get::<_, String>(3)?
        .parse()
        .map_err(|e| conversion_error(3, e))?;
    let created_at = DateTime::parse_from_rfc3339(&row.get::<_, String>(6)?)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(6, e))?;
    let updated_at = DateTime::parse_from_rfc3339(&row.get::<_, String>(7)?)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(7, e))?;

    Ok(WorkItem {
        id,
        title: row.get(1)?,
        source_path: row.get::<_, String>(2)?.into(),
        stage,
        metadata: row
            .get::<_, Option<String>>(4)?
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| conversion_error(4, e))?,
        error: row.get(5)?,
        created_at,
        updated_at,
    })
}

const ITEM_COLUMNS: &str =
    "id, title, source_path, stage, metadata, error, created_at, updated_at";

/// Insert or replace a work item in a single atomic statement.
pub fn upsert_item(conn: &Connection, item: &WorkItem) -> Result<()> {
    let metadata = item
        .metadata
        .as_ref()
        .map(|m| serde_json::to_string(m))
        .transpose()
        .map_err(|e| Error::database(format!("Failed to encode metadata: {}", e)))?;

    conn.execute(
        "INSERT INTO work_items (id, title, source_path, stage, metadata, error, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             title = excluded.title,
             source_path = excluded.source_path,
             stage = excluded.stage,
             metadata = excluded.metadata,
             error = excluded.error,
             updated_at = excluded.updated_at",
        params![
            item.id.to_string(),
            item.title,
            item.source_path.to_string_lossy(),
            item.stage.to_string(),
            metadata,
            item.error,
            item.created_at.to_rfc3339(),
            item.updated_at.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// Get a work item by ID.
pub fn get_item(conn: &Connection, id: ItemId) -> Result<WorkItem> {
    conn.query_row(
        &format!("SELECT {} FROM work_items WHERE id = ?", ITEM_COLUMNS),
        [id.to_string()],
        item_from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => Error::not_found(id.to_string()),
        _ => Error::database(e.to_string()),
    })
}

/// List work items, optionally filtered by stage, in creation order.
pub fn list_items(conn: &Connection, stage: Option<Stage>) -> Result<Vec<WorkItem>> {
    let (sql, filter) = match stage {
        Some(stage) => (
            format!(
                "SELECT {} FROM work_items WHERE stage = ? ORDER BY created_at ASC",
                ITEM_COLUMNS
            ),
            Some(stage.to_string()),
        ),
        None => (
            format!(
                "SELECT {} FROM work_items ORDER BY created_at ASC",
                ITEM_COLUMNS
            ),
            None,
        ),
    };

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = match filter {
        Some(stage) => stmt.query_map([stage], item_from_row),
        None => stmt.query_map([], item_from_row),
    }
    .map_err(|e| Error::database(e.to_string()))?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))
}

/// Delete every work item record. Artifacts on disk are untouched.
/// Returns the number of rows removed.
pub fn delete_all(conn: &Connection) -> Result<usize> {
    conn.execute("DELETE FROM work_items", [])
        .map_err(|e| Error::database(e.to_string()))
}

/// Reset items left in an in-flight marker by a previous session to the
/// stable stage before it. Returns the number of items reset.
pub fn reset_in_flight(conn: &Connection) -> Result<usize> {
    let now = Utc::now().to_rfc3339();
    let mut affected = 0;

    for marker in [Stage::Processing, Stage::Queued] {
        affected += conn
            .execute(
                "UPDATE work_items SET stage = ?, updated_at = ? WHERE stage = ?",
                params![marker.settled().to_string(), now, marker.to_string()],
            )
            .map_err(|e| Error::database(e.to_string()))?;
    }

    Ok(affected)
}
