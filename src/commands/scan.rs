use clap::Args;

use epcscan::config::Config;
use epcscan::ScanFeedback;

use super::Context;

#[derive(Args)]
pub struct ScanCommand {
    /// EPC read from the tag (24 characters, starting with 'E')
    pub epc: String,
}

impl ScanCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let ctx = Context::open(config).await?;
        ctx.refresh_connectivity().await;

        let feedback = ctx.station.submit_scan(&self.epc).await?;
        println!("{}", feedback);

        if let ScanFeedback::Invalid { .. } = feedback {
            return Err("scan rejected".into());
        }
        Ok(())
    }
}
