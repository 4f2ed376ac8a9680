//! Clipflow - Pipeline coordinator for short-form video repurposing
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod coordinator;
pub mod events;
