//! Interactive station loop.
//!
//! Reads one EPC per line from stdin (a keyboard-wedge scanner types the tag
//! followed by Enter) until EOF or Ctrl-C. Background tasks keep the
//! connectivity flag fresh, drain the offline queue whenever the network
//! comes back, and clear the previous day's logs at local midnight.

use chrono::{Duration as ChronoDuration, Local, Utc};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use epcscan::config::Config;
use epcscan::gateway::HttpGateway;
use epcscan::models::start_of_day;
use epcscan::sync::drain_on_reconnect;
use epcscan::{ScanFeedback, Station};

use super::Context;

#[derive(Args)]
pub struct RunCommand {
    /// Don't drain the offline queue at startup
    #[arg(long)]
    no_startup_sync: bool,
}

impl RunCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let ctx = Context::open(config).await?;
        let online = ctx.refresh_connectivity().await;
        let Context { station, monitor } = ctx;
        let station = Arc::new(station);
        let monitor = monitor.map(Arc::new);

        if let Err(e) = station.clean_logs(&Local::now()).await {
            tracing::warn!("Failed to clean logs: {}", e);
        }

        if online && !self.no_startup_sync {
            let outcome = station.sync().await;
            tracing::info!("Startup sync: {}", outcome);
        } else if !online {
            tracing::warn!("Starting offline, scans will be queued locally");
        }

        // Watch for reconnects before the monitor can flip the flag
        let mut tasks: Vec<JoinHandle<()>> = vec![tokio::spawn(drain_on_reconnect(
            station.reconciler(),
            config.connectivity.sync_delay(),
        ))];
        if let Some(monitor) = &monitor {
            let monitor = monitor.clone();
            tasks.push(tokio::spawn(async move { monitor.run().await }));
        }
        tasks.push(tokio::spawn(clean_logs_at_midnight(station.clone())));

        println!("Station {} ready. Scan a tag (Ctrl-D to quit).", station.station_no());

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            match station.submit_scan(&line).await {
                Ok(feedback) => {
                    println!("{}", feedback);
                    if feedback.refreshes_view() {
                        print_counts(&station).await;
                    }
                    // A failed call while the flag still reads online
                    if matches!(feedback, ScanFeedback::SavedOffline { .. })
                        && station.connectivity().is_online()
                    {
                        if let Some(monitor) = &monitor {
                            monitor.probe().await;
                        }
                    }
                }
                Err(e) => println!("Error: {}", e),
            }
        }

        for task in tasks {
            task.abort();
        }
        tracing::info!("Station stopped");
        Ok(())
    }
}

async fn print_counts(station: &Station<HttpGateway>) {
    match station.remote_counts().await {
        Ok(counts) => match counts.customer {
            Some(customer) => println!("  today: {} (customer: {})", counts.station, customer),
            None => println!("  today: {}", counts.station),
        },
        Err(e) => tracing::warn!("Failed to refresh daily counts: {}", e),
    }
}

async fn clean_logs_at_midnight(station: Arc<Station<HttpGateway>>) {
    loop {
        let next_midnight = start_of_day(&(Local::now() + ChronoDuration::days(1)));
        let wait = (next_midnight - Utc::now())
            .to_std()
            .unwrap_or(Duration::from_secs(60));
        tokio::time::sleep(wait).await;

        if let Err(e) = station.clean_logs(&Local::now()).await {
            tracing::warn!("Failed to clean logs: {}", e);
        }
    }
}
