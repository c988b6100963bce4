//! Status command implementation
//!
//! This module implements the `status` command for displaying the
//! per-network discovery state of patients.

use super::{connect, print_network_table, EXIT_CONFIG, EXIT_FATAL, EXIT_OK};
use crate::domain::{CxId, PatientId};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Customer ID
    #[arg(long)]
    pub cx_id: String,

    /// Restrict to one patient
    #[arg(long)]
    pub patient_id: Option<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(cx_id = %self.cx_id, "Checking discovery status");

        println!("📊 Discovery Status");
        println!();

        let cx_id = match CxId::new(self.cx_id.as_str()) {
            Ok(id) => id,
            Err(e) => {
                println!("❌ Invalid arguments: {e}");
                return Ok(EXIT_CONFIG);
            }
        };
        let patient_filter = match self.patient_id.as_deref().map(PatientId::new).transpose() {
            Ok(id) => id,
            Err(e) => {
                println!("❌ Invalid arguments: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let (_config, runtime) = match connect(config_path).await {
            Ok(r) => r,
            Err(code) => return Ok(code),
        };

        let patients = match runtime.store.list_patients(Some(&cx_id)).await {
            Ok(p) => p,
            Err(e) => {
                println!("❌ Failed to load patients");
                println!("   Error: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        let filtered: Vec<_> = patients
            .iter()
            .filter(|p| patient_filter.as_ref().map_or(true, |id| &p.patient_id == id))
            .collect();

        if filtered.is_empty() {
            println!("No patients match the specified filters.");
            return Ok(EXIT_OK);
        }

        println!("Found {} patient(s):", filtered.len());
        for patient in filtered {
            println!();
            println!("Patient {}", patient.key());
            print_network_table(patient);
        }
        println!();

        Ok(EXIT_OK)
    }
}
