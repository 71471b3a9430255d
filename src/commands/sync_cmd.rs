//! Manual replay of the offline queue.

use clap::Args;

use epcscan::config::Config;
use epcscan::sync::DrainOutcome;

use super::Context;

#[derive(Debug, Args)]
pub struct SyncCommand {}

impl SyncCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let ctx = Context::open(config).await?;

        if !ctx.refresh_connectivity().await {
            println!("Network is still offline. Cannot sync.");
            return Ok(());
        }

        println!("Syncing offline data...");
        println!();

        let outcome = ctx.station.sync().await;
        if let DrainOutcome::Completed(report) = &outcome {
            println!("  ✓ {} synced", report.synced);
            if report.rejected > 0 {
                println!("    {} rejected by the central database", report.rejected);
            }
            if report.failed > 0 {
                println!("  ✗ {} still pending", report.failed);
            }
            println!();
        }
        println!("{}", outcome);

        match outcome {
            DrainOutcome::Aborted(_) => Err("sync aborted".into()),
            _ => Ok(()),
        }
    }
}
