use clap::Args;

use epcscan::config::Config;

use super::{Context, OutputFormat};

#[derive(Args)]
pub struct RecordsCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl RecordsCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let ctx = Context::open(config).await?;
        let records = ctx.station.recent_records().await?;

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
            OutputFormat::Text => {
                if records.is_empty() {
                    println!("No records today.");
                    return Ok(());
                }
                println!("{:<26} {:<8} {:<14} MATCHKEYID", "EPC", "SIZE", "MO");
                for record in &records {
                    println!(
                        "{:<26} {:<8} {:<14} {}",
                        record.epc_code,
                        record.size_code.as_deref().unwrap_or("-"),
                        record.mo_no.as_deref().unwrap_or("-"),
                        record.matchkeyid
                    );
                }
            }
        }
        Ok(())
    }
}
