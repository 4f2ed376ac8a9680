//! Clipflow-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across clipflow:
//!
//! - **Typed IDs**: Type-safe UUID wrapper for work items
//! - **Stages**: The pipeline stage enum and its transition rules
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use clipflow_common::{ItemId, Stage, Error, Result};
//!
//! // Create typed IDs
//! let item_id = ItemId::new();
//!
//! // Check stage transitions
//! assert!(Stage::Downloaded.can_advance_to(Stage::Processed));
//!
//! // Use common error types
//! fn example() -> Result<()> {
//!     Err(Error::not_found("work item"))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod stage;

pub use error::{Error, Result};
pub use ids::*;
pub use stage::*;

/// Metadata fields attached to a work item once the metadata stage completes
/// (title, description, tags, and whatever else the generator produces).
pub type MetadataFields = serde_json::Map<String, serde_json::Value>;
