use clap::Args;
use std::io::{self, Write};

use epcscan::config::Config;

use super::Context;

#[derive(Args)]
pub struct DeleteCommand {
    /// Match key of the record to delete
    pub matchkeyid: String,

    /// EPC of the record, written to the delete log
    #[arg(long)]
    pub epc: String,

    /// Station number the record belongs to (defaults to this station)
    #[arg(long)]
    pub station: Option<String>,

    /// Skip confirmation prompt
    #[arg(long, short)]
    pub force: bool,
}

impl DeleteCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        if !self.force {
            print!(
                "Delete record '{}' (EPC {}) from both tables? [y/N] ",
                self.matchkeyid, self.epc
            );
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled.");
                return Ok(());
            }
        }

        let ctx = Context::open(config).await?;
        let summary = ctx
            .station
            .delete_record(&self.matchkeyid, &self.epc, self.station.as_deref())
            .await?;

        println!(
            "Deleted record {}: {} primary, {} backup row(s).",
            self.matchkeyid.trim(),
            summary.primary_deleted,
            summary.backup_deleted
        );
        Ok(())
    }
}
