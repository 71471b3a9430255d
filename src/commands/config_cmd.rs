use clap::{Args, Subcommand};

use epcscan::config::Config;

use super::OutputFormat;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("database_path: {}", config.database_path.value.display());
                        println!("  source: {}", config.database_path.source);
                        println!();

                        println!("log_dir: {}", config.log_dir.value.display());
                        println!("  source: {}", config.log_dir.source);
                        println!();

                        println!("station_no: {}", config.station_no.value);
                        println!("  source: {}", config.station_no.source);
                        if let Some(cus) = &config.station.station_no_cus {
                            println!("station_no_cus: {}", cus);
                        }
                        println!("factory_code: {}", config.station.factory_code);
                        println!();

                        match &config.remote.server_url {
                            Some(url) => println!("remote.server_url: {}", url),
                            None => println!("remote.server_url: (not configured)"),
                        }
                        println!("remote.procedure: {}", config.remote.procedure);
                        println!(
                            "remote.api_key: {}",
                            if config.remote.api_key.is_some() {
                                "set"
                            } else {
                                "not set"
                            }
                        );
                        println!();

                        match config.probe_url() {
                            Some(url) => println!("connectivity.probe_url: {}", url),
                            None => println!("connectivity.probe_url: (none)"),
                        }
                        println!(
                            "connectivity.probe_interval: {}s",
                            config.connectivity.probe_interval().as_secs()
                        );
                        println!(
                            "connectivity.sync_delay: {}s",
                            config.connectivity.sync_delay_secs
                        );
                    }
                }
                Ok(())
            }
        }
    }
}
