//! Best-effort matching of a download report against known items.
//!
//! Used only to deduplicate repeated download reports for the same source;
//! every later stage carries the item id explicitly. A candidate matches on
//! exact title, or when the reported artifact's filename starts with the
//! known artifact's filename stripped of its extension. The heuristic can
//! miss (duplicate items) or over-match (unrelated items merged); callers
//! treat zero or multiple candidates as "create a new item".

use clipflow_db::models::WorkItem;
use std::path::Path;

pub(super) fn find_candidates<'a>(
    items: impl Iterator<Item = &'a WorkItem>,
    title: &str,
    path: &Path,
) -> Vec<&'a WorkItem> {
    let reported_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    items
        .filter(|item| {
            if item.title == title {
                return true;
            }
            match item.source_path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if !stem.is_empty() => reported_name.starts_with(stem),
                _ => false,
            }
        })
        .collect()
}
