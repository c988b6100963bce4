//! Discover command implementation
//!
//! Runs or schedules patient discovery on every enabled network under one
//! request ID, then optionally waits for the runs to settle.

use super::{
    connect, patient_key, print_network_table, wait_for_settle, EXIT_CONFIG, EXIT_FATAL, EXIT_OK,
};
use crate::core::discovery::{CrossNetworkReport, DiscoveryFlags};
use crate::domain::{FacilityId, RequestId};
use clap::Args;
use std::time::Duration;
use tokio::sync::watch;

/// Arguments for the discover command
#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Customer ID
    #[arg(long)]
    pub cx_id: String,

    /// Patient ID
    #[arg(long)]
    pub patient_id: String,

    /// Facility the discovery runs under
    #[arg(long)]
    pub facility_id: String,

    /// Request ID shared by both networks (generated if omitted)
    #[arg(long)]
    pub request_id: Option<String>,

    /// Start discovery on every network regardless of prior state
    #[arg(long)]
    pub initial: bool,

    /// Re-run discovery when demographics change
    #[arg(long)]
    pub rerun_on_new_demographics: bool,

    /// Organization OID to exclude from matching (repeatable)
    #[arg(long = "exclude-org", value_name = "OID")]
    pub exclude_org: Vec<String>,

    /// Run on Carequality even if it is disabled
    #[arg(long)]
    pub force_carequality: bool,

    /// Run on CommonWell even if it is disabled
    #[arg(long)]
    pub force_commonwell: bool,

    /// Seconds to wait for the runs to settle
    ///
    /// Runs still in flight afterwards are settled as failed.
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    pub wait_seconds: u64,
}

impl DiscoverArgs {
    fn flags(&self) -> DiscoveryFlags {
        DiscoveryFlags {
            rerun_pd_on_new_demographics: self.rerun_on_new_demographics,
            org_id_exclude_list: (!self.exclude_org.is_empty()).then(|| self.exclude_org.clone()),
            force_carequality: self.force_carequality,
            force_commonwell: self.force_commonwell,
        }
    }

    /// Execute the discover command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let parsed = patient_key(&self.cx_id, &self.patient_id).and_then(|key| {
            let facility_id = FacilityId::new(self.facility_id.as_str())?;
            let request_id = self
                .request_id
                .as_deref()
                .map(RequestId::new)
                .transpose()?;
            Ok((key, facility_id, request_id))
        });
        let (key, facility_id, request_id) = match parsed {
            Ok(p) => p,
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
            cx_id = %key.cx_id,
            patient_id = %key.patient_id,
            initial = self.initial,
            "Starting discover command"
        );
        println!("🔎 Patient discovery for {key}");
        println!();

        let flags = self.flags();
        let report = if self.initial {
            let patient = runtime.store.get_patient(&key).await?;
            runtime
                .orchestrator
                .run_initial_discovery_across_networks(&patient, &facility_id, &flags, request_id)
                .await
        } else {
            runtime
                .orchestrator
                .run_or_schedule_across_networks(&key, &facility_id, &flags, request_id)
                .await
        };
        print_report(&report);

        let settled = wait_for_settle(
            &runtime.coordinator,
            Duration::from_secs(self.wait_seconds),
            shutdown_signal,
        )
        .await;
        if !settled {
            println!("⚠️  Discovery did not settle in time; rerun discover to retry");
        }

        println!();
        let patient = runtime.store.get_patient(&key).await?;
        print_network_table(&patient);
        println!();

        Ok(if report.failures() > 0 { EXIT_FATAL } else { EXIT_OK })
    }
}

fn print_report(report: &CrossNetworkReport) {
    println!("Request ID: {}", report.request_id);
    if report.dispatches.is_empty() {
        println!("⚠️  No network is enabled");
    }
    for dispatch in &report.dispatches {
        match &dispatch.outcome {
            Ok(outcome) => println!("  ✅ {}: {}", dispatch.network, outcome.as_str()),
            Err(e) => println!("  ❌ {}: {}", dispatch.network, e),
        }
    }
    println!();
}
