mod config_cmd;
mod delete;
mod log_cmd;
mod records;
mod run_cmd;
mod scan;
mod status;
mod sync_cmd;

pub use config_cmd::ConfigCommand;
pub use delete::DeleteCommand;
pub use log_cmd::LogCommand;
pub use records::RecordsCommand;
pub use run_cmd::RunCommand;
pub use scan::ScanCommand;
pub use status::StatusCommand;
pub use sync_cmd::SyncCommand;

use clap::ValueEnum;

use epcscan::audit::AuditLog;
use epcscan::config::Config;
use epcscan::connectivity::{ConnectivityMonitor, ConnectivityState, HttpProbe};
use epcscan::db::init_db;
use epcscan::gateway::{GatewayError, HttpGateway};
use epcscan::Station;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Everything a command needs to talk to both stores.
pub(crate) struct Context {
    pub station: Station<HttpGateway>,
    pub monitor: Option<ConnectivityMonitor<HttpProbe>>,
}

impl Context {
    pub async fn open(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let pool = init_db(&config.database_path.value).await?;
        let gateway = HttpGateway::from_config(&config.remote)?;
        let connectivity = ConnectivityState::new();

        let monitor = match config.probe_url() {
            Some(url) => {
                let probe = HttpProbe::new(url, config.connectivity.probe_timeout())
                    .map_err(|e| GatewayError::Connection(e.to_string()))?;
                Some(ConnectivityMonitor::new(
                    connectivity.clone(),
                    probe,
                    config.connectivity.probe_interval(),
                ))
            }
            None => None,
        };

        let station = Station::new(
            config.station.clone(),
            pool,
            gateway,
            connectivity,
            AuditLog::new(config.log_dir.value.clone()),
        );

        Ok(Self { station, monitor })
    }

    /// Runs one probe so the flag reflects the network before any call.
    pub async fn refresh_connectivity(&self) -> bool {
        if let Some(monitor) = &self.monitor {
            monitor.probe().await;
        }
        self.station.connectivity().is_online()
    }
}
