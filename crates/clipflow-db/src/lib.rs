//! Clipflow-DB: Database schema, migrations, and query operations
//!
//! This crate provides the durable store for clipflow work items using SQLite
//! with rusqlite and r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database schema
//! - `queries` - Database query operations
//!
//! # Example
//!
//! ```no_run
//! use clipflow_db::pool::{init_pool, get_conn};
//! use clipflow_db::models::WorkItem;
//! use clipflow_db::queries::work_items;
//!
//! let pool = init_pool("/var/lib/clipflow/clipflow.db").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let item = WorkItem::new("Cat video", "/videos/a.mp4");
//! work_items::upsert_item(&conn, &item).unwrap();
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
