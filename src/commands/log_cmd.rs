use chrono::Local;
use clap::{Args, Subcommand};

use epcscan::config::Config;
use epcscan::db::{init_db, ScanLogRepository};
use epcscan::models::{start_of_day, LogKind};

use super::OutputFormat;

#[derive(Args)]
pub struct LogCommand {
    /// Which log: errors or duplicates
    #[arg(value_parser = parse_kind)]
    pub kind: LogKind,

    #[command(subcommand)]
    pub command: Option<LogSubcommand>,
}

#[derive(Subcommand)]
pub enum LogSubcommand {
    /// List entries (default)
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Remove a single entry
    Remove {
        /// Entry ID
        id: i64,
    },

    /// Remove entries from previous days, in both logs
    Clean,
}

fn parse_kind(s: &str) -> Result<LogKind, String> {
    s.parse()
}

impl LogCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let pool = init_db(&config.database_path.value).await?;
        let repo = ScanLogRepository::new(pool);

        match &self.command {
            None => self.list(&repo, &OutputFormat::Text).await,
            Some(LogSubcommand::List { format }) => self.list(&repo, format).await,
            Some(LogSubcommand::Remove { id }) => {
                if repo.remove(self.kind, *id).await? {
                    println!("Removed {} log entry {}", self.kind, id);
                    Ok(())
                } else {
                    Err(format!("No {} log entry with ID {}", self.kind, id).into())
                }
            }
            Some(LogSubcommand::Clean) => {
                let removed = repo.purge_before(start_of_day(&Local::now())).await?;
                println!("Removed {} entr(ies) from previous days", removed);
                Ok(())
            }
        }
    }

    async fn list(
        &self,
        repo: &ScanLogRepository,
        format: &OutputFormat,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let entries = repo.list(self.kind).await?;

        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
            OutputFormat::Text => {
                if entries.is_empty() {
                    println!("No {} log entries.", self.kind);
                    return Ok(());
                }
                for entry in &entries {
                    let logged_at = entry.logged_at.with_timezone(&Local);
                    println!(
                        "{:>5}  {}  {}",
                        entry.id,
                        entry.epc,
                        logged_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
                println!();
                println!("{} entr(ies)", entries.len());
            }
        }
        Ok(())
    }
}
