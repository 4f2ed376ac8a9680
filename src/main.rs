mod cli;

use clipflow::{config, coordinator::Coordinator};
use clipflow_common::{ItemId, Stage};
use clipflow_db::pool::init_pool;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "clipflow=trace,clipflow_db=debug,clipflow_common=debug".to_string()
        } else {
            "clipflow=info,clipflow_db=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Status { stage, json } => {
            let coordinator = open_coordinator(cli.config.as_deref())?;
            show_status(&coordinator, stage, json)
        }
        Commands::Counts => {
            let coordinator = open_coordinator(cli.config.as_deref())?;
            show_counts(&coordinator)
        }
        Commands::Fail { id, reason } => {
            let coordinator = open_coordinator(cli.config.as_deref())?;
            fail_item(&coordinator, id, &reason)
        }
        Commands::Requeue { id, stage } => {
            let coordinator = open_coordinator(cli.config.as_deref())?;
            requeue_item(&coordinator, id, stage)
        }
        Commands::Clear { yes } => {
            if !yes {
                anyhow::bail!(
                    "Clearing removes every work item record and cannot be undone. \
                     Re-run with --yes to confirm. Artifacts on disk are not deleted."
                );
            }
            let coordinator = open_coordinator(cli.config.as_deref())?;
            let removed = coordinator.clear_all()?;
            println!("Removed {} work items", removed);
            Ok(())
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("clipflow {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_coordinator(config_path: Option<&std::path::Path>) -> Result<Arc<Coordinator>> {
    let config = config::load_config_or_default(config_path)?;

    let db_path = config.storage.db_path();
    let db_path_str = db_path.to_string_lossy();
    tracing::debug!("Opening database at {}", db_path_str);
    let pool = init_pool(&db_path_str)?;

    Ok(Coordinator::open(pool, config.events.channel_capacity)?)
}

fn show_status(
    coordinator: &Coordinator,
    stage: Option<Stage>,
    json: bool,
) -> Result<()> {
    let items = coordinator.get_snapshot(stage);

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        match stage {
            Some(stage) => println!("No items in stage {}", stage),
            None => println!("No work items tracked"),
        }
        return Ok(());
    }

    for item in &items {
        print!("{}  {:<14}  {}", item.id, item.stage.to_string(), item.title);
        if let Some(ref error) = item.error {
            print!("  ({})", error);
        }
        println!();
        println!("    {}", item.source_path.display());
    }
    println!("\n{} items", items.len());

    Ok(())
}

fn show_counts(coordinator: &Coordinator) -> Result<()> {
    let counts = coordinator.stage_counts();
    let total: usize = counts.values().sum();

    println!("Videos: {}", total);
    for (stage, count) in &counts {
        println!("  {:<14} {}", stage.to_string(), count);
    }

    Ok(())
}

fn fail_item(coordinator: &Coordinator, id: ItemId, reason: &str) -> Result<()> {
    let item = coordinator.mark_failed(id, reason)?;
    println!("Failed {} ({}): {}", item.id, item.title, reason);
    Ok(())
}

fn requeue_item(coordinator: &Coordinator, id: ItemId, stage: Stage) -> Result<()> {
    let item = coordinator.requeue(id, stage)?;
    println!("Requeued {} ({}) to {}", item.id, item.title, item.stage);
    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Data dir: {:?}", config.storage.data_dir);
            println!("  Database: {:?}", config.storage.db_path());
            println!("  Event channel capacity: {}", config.events.channel_capacity);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Data dir: {:?}", config.storage.data_dir);
            println!("  Database: {:?}", config.storage.db_path());
        }
    }

    Ok(())
}
