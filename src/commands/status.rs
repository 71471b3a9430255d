use clap::Args;
use serde::Serialize;

use epcscan::config::Config;
use epcscan::{LocalCounts, RemoteCounts};

use super::{Context, OutputFormat};

#[derive(Args)]
pub struct StatusCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Serialize)]
struct Status<'a> {
    station_no: &'a str,
    online: bool,
    local: LocalCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote: Option<RemoteCounts>,
}

impl StatusCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let ctx = Context::open(config).await?;
        let online = ctx.refresh_connectivity().await;

        let local = ctx.station.local_counts().await?;
        let remote = if online {
            match ctx.station.remote_counts().await {
                Ok(counts) => Some(counts),
                Err(e) => {
                    tracing::warn!("Failed to fetch daily counts: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let status = Status {
            station_no: ctx.station.station_no(),
            online,
            local,
            remote,
        };

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
            OutputFormat::Text => print_status(&status),
        }
        Ok(())
    }
}

fn print_status(status: &Status<'_>) {
    println!("Station {}", status.station_no);
    println!("==========");
    println!();
    println!(
        "Network:    {}",
        if status.online { "✓ online" } else { "✗ offline" }
    );
    println!("Pending:    {}", status.local.pending);
    println!("Errors:     {}", status.local.errors);
    println!("Duplicates: {}", status.local.duplicates);

    match &status.remote {
        Some(remote) => {
            println!("Today:      {}", remote.station);
            if let Some(customer) = remote.customer {
                println!("Customer:   {}", customer);
            }
        }
        None => println!("Today:      unavailable"),
    }
}
