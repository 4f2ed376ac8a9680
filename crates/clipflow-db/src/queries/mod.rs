//! Database query operations.
//!
//! Each submodule groups the operations for one table.

pub mod work_items;
