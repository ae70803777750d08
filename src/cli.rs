use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use storekeeper::{MaintenanceConfig, run_startup_maintenance};

#[derive(Parser)]
#[command(name = "storekeeper")]
#[command(about = "storekeeper - startup storage maintenance for a messaging agent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one maintenance pass (the default when no command is given)
    Run {
        /// Base directory holding session/, the temp directories and store.json
        #[arg(long, default_value = ".")]
        base_dir: PathBuf,
    },
    /// Display version information
    Version,
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command.unwrap_or(Commands::Run {
        base_dir: PathBuf::from("."),
    }) {
        Commands::Run { base_dir } => {
            let config = MaintenanceConfig::for_base_dir(&base_dir);
            let runtime =
                tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
            let report = runtime.block_on(run_startup_maintenance(config, Utc::now()));
            tracing::debug!(?report, "Maintenance pass finished");
            // Best-effort semantics: a completed pass always exits 0, whatever
            // the individual janitors ran into.
            Ok(())
        }
        Commands::Version => {
            println!("storekeeper {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
