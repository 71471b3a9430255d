use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{
    ConfigCommand, DeleteCommand, LogCommand, RecordsCommand, RunCommand, ScanCommand,
    StatusCommand, SyncCommand,
};
use epcscan::config::Config;

#[derive(Parser)]
#[command(name = "epcscan")]
#[command(version)]
#[command(about = "RFID EPC scanning station with an offline queue", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read scans from stdin, one EPC per line, until EOF
    Run(RunCommand),

    /// Submit a single scan
    Scan(ScanCommand),

    /// Replay the offline queue against the central database
    Sync(SyncCommand),

    /// Show connectivity, queue and daily counts
    Status(StatusCommand),

    /// Show the station's most recent records
    Records(RecordsCommand),

    /// Delete a record from the central database
    Delete(DeleteCommand),

    /// Manage the error and duplicate logs
    Log(LogCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "epcscan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Run(cmd)) => cmd.run(&config).await?,
        Some(Commands::Scan(cmd)) => cmd.run(&config).await?,
        Some(Commands::Sync(cmd)) => cmd.run(&config).await?,
        Some(Commands::Status(cmd)) => cmd.run(&config).await?,
        Some(Commands::Records(cmd)) => cmd.run(&config).await?,
        Some(Commands::Delete(cmd)) => cmd.run(&config).await?,
        Some(Commands::Log(cmd)) => cmd.run(&config).await?,
        Some(Commands::Config(cmd)) => cmd.run(&config)?,
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
