//! Reset-schedule command implementation

use super::{connect, patient_key, EXIT_CONFIG, EXIT_FATAL, EXIT_OK};
use crate::domain::HieNetwork;
use clap::Args;

/// Arguments for the reset-schedule command
#[derive(Args, Debug)]
pub struct ResetScheduleArgs {
    /// Customer ID
    #[arg(long)]
    pub cx_id: String,

    /// Patient ID
    #[arg(long)]
    pub patient_id: String,

    /// Network (carequality | cq | commonwell | cw)
    #[arg(long)]
    pub network: HieNetwork,
}

impl ResetScheduleArgs {
    /// Execute the reset-schedule command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let key = match patient_key(&self.cx_id, &self.patient_id) {
            Ok(k) => k,
            Err(e) => {
                println!("❌ Invalid arguments: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let (_config, runtime) = match connect(config_path).await {
            Ok(r) => r,
            Err(code) => return Ok(code),
        };

        match runtime
            .coordinator
            .scheduler()
            .reset_scheduled_patient_discovery(self.network, &key)
            .await
        {
            Ok(_) => {
                println!("✅ Scheduled {} discovery cleared for {}", self.network, key);
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Failed to reset scheduled discovery");
                println!("   Error: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }
}
