//! Progress command implementation
//!
//! Settles a discovery run by hand, for patients left in `processing`.

use super::{
    connect, patient_key, print_network_table, wait_for_settle, EXIT_CONFIG, EXIT_FATAL, EXIT_OK,
};
use crate::domain::{DiscoveryStatus, HieNetwork};
use clap::Args;
use std::time::Duration;
use tokio::sync::watch;

/// Arguments for the progress command
#[derive(Args, Debug)]
pub struct ProgressArgs {
    /// Customer ID
    #[arg(long)]
    pub cx_id: String,

    /// Patient ID
    #[arg(long)]
    pub patient_id: String,

    /// Network (carequality | cq | commonwell | cw)
    #[arg(long)]
    pub network: HieNetwork,

    /// New status (completed | failed)
    #[arg(long)]
    pub status: DiscoveryStatus,

    /// Seconds to wait for chained work to settle
    ///
    /// Runs still in flight afterwards are settled as failed.
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    pub wait_seconds: u64,
}

impl ProgressArgs {
    /// Execute the progress command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        if !self.status.is_terminal() {
            println!("❌ --status must be completed or failed");
            return Ok(EXIT_CONFIG);
        }
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

        tracing::info!(
            network = %self.network,
            cx_id = %key.cx_id,
            patient_id = %key.patient_id,
            status = %self.status,
            "Settling discovery manually"
        );

        let Some(patient) = runtime
            .coordinator
            .process_discovery_progress(self.network, &key, self.status)
            .await
        else {
            println!("❌ Failed to update discovery status; see logs");
            return Ok(EXIT_FATAL);
        };
        println!("✅ {} discovery marked {}", self.network, self.status);

        let settled = wait_for_settle(
            &runtime.coordinator,
            Duration::from_secs(self.wait_seconds),
            shutdown_signal,
        )
        .await;
        if !settled {
            println!("⚠️  Chained work did not settle in time");
        }

        println!();
        let latest = runtime.store.get_patient(&key).await.unwrap_or(patient);
        print_network_table(&latest);
        Ok(EXIT_OK)
    }
}
