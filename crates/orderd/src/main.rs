//! orderd - order intake and receipt delivery daemon.

mod app;

use clap::{Parser, Subcommand};
use orderd_config::{init_logging, Config};
use std::path::PathBuf;

/// orderd command-line interface.
#[derive(Parser)]
#[command(name = "orderd")]
#[command(about = "Order intake and receipt delivery daemon")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the JSON config file
    #[arg(short, long, default_value = "orderd.json", global = true)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon (retry sweeps and shipment batches) until ctrl-c
    Run,
    /// Ingest a JSON file of order rows and deliver the receipt
    Ingest {
        /// File containing a JSON array of order rows
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Manually recover a stuck receipt by trace id
    Recover {
        /// Trace id of the receipt to recover
        trace_id: String,
        /// Replace the participant segment of the file name
        #[arg(long)]
        participant: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    init_logging(&config.log_level);

    match cli.command {
        Some(Commands::Run) | None => app::run_daemon(config).await?,
        Some(Commands::Ingest { file }) => app::ingest(config, &file).await?,
        Some(Commands::Recover {
            trace_id,
            participant,
        }) => app::recover(config, trace_id, participant)?,
    }

    Ok(())
}
