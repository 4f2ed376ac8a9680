use clap::{Parser, Subcommand};
use clipflow_common::{ItemId, Stage};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clipflow")]
#[command(author, version, about = "Short-form video repurposing pipeline coordinator")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tracked work items and their pipeline stage
    Status {
        /// Only show items in this stage (downloaded, processing, processed,
        /// metadata_ready, queued, uploaded, failed)
        #[arg(long)]
        stage: Option<Stage>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show item counts per pipeline stage
    Counts,

    /// Force an item into the failed stage
    Fail {
        /// Item to fail
        id: ItemId,

        /// Failure reason to record
        reason: String,
    },

    /// Reset a failed item to an earlier stage
    Requeue {
        /// Item to requeue
        id: ItemId,

        /// Stage to reset the item to
        stage: Stage,
    },

    /// Delete all work item records (artifacts on disk are untouched)
    Clear {
        /// Confirm the irreversible clear
        #[arg(long)]
        yes: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
