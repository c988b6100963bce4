//! CLI command implementations
//!
//! This module contains all CLI command implementations and the helpers
//! they share. Commands return a process exit code:
//!
//! - `0` success
//! - `2` configuration or argument error
//! - `4` connection error
//! - `5` fatal error

pub mod discover;
pub mod init;
pub mod progress;
pub mod reset_schedule;
pub mod schedule_doc_query;
pub mod status;
pub mod validate;

use crate::config::{load_config, HieConfig};
use crate::core::discovery::DiscoveryCoordinator;
use crate::core::runtime::HieRuntime;
use crate::domain::{CxId, HieNetwork, PatientId, PatientKey, PatientRecord};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub(crate) const EXIT_OK: i32 = 0;
pub(crate) const EXIT_CONFIG: i32 = 2;
pub(crate) const EXIT_CONNECTION: i32 = 4;
pub(crate) const EXIT_FATAL: i32 = 5;

/// Load configuration and wire the runtime, printing the failure and
/// returning its exit code on error
pub(crate) async fn connect(config_path: &str) -> Result<(HieConfig, HieRuntime), i32> {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            println!("❌ Failed to load configuration file");
            println!("   Error: {e}");
            return Err(EXIT_CONFIG);
        }
    };

    let runtime = match HieRuntime::from_config(&config).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize orchestration core");
            println!("❌ Failed to connect to patient store");
            println!("   Error: {e}");
            return Err(EXIT_CONNECTION);
        }
    };

    Ok((config, runtime))
}

/// Build a patient key from raw CLI arguments
pub(crate) fn patient_key(cx_id: &str, patient_id: &str) -> Result<PatientKey, String> {
    Ok(PatientKey::new(CxId::new(cx_id)?, PatientId::new(patient_id)?))
}

/// Wait for detached runs to settle, bounded by `wait` and by shutdown
///
/// The process exits after the command, which would drop runs still in
/// flight and leave their networks processing. Those runs are settled as
/// failed instead. Returns `true` when everything settled on its own.
pub(crate) async fn wait_for_settle(
    coordinator: &Arc<DiscoveryCoordinator>,
    wait: Duration,
    mut shutdown_signal: watch::Receiver<bool>,
) -> bool {
    println!("⏳ Waiting up to {}s for discovery to settle...", wait.as_secs());
    let settled = tokio::select! {
        settled = tokio::time::timeout(wait, coordinator.wait_idle()) => settled.is_ok(),
        _ = shutdown_signal.changed() => {
            println!("⚠️  Shutdown requested, stopped waiting");
            false
        }
    };

    if !settled {
        let failed = coordinator.fail_abandoned_runs().await;
        if failed > 0 {
            tracing::warn!(runs = failed, "Settled unfinished discovery runs as failed");
            println!("⚠️  {failed} unfinished discovery run(s) settled as failed");
        }
    }
    settled
}

/// One status row per network
pub(crate) fn print_network_table(patient: &PatientRecord) {
    println!(
        "{:<13} {:<14} {:<38} {:<21} {:<38} {:<38}",
        "Network", "Status", "Request ID", "Started", "Scheduled PD", "Scheduled DQ"
    );
    println!("{}", "-".repeat(167));

    for network in HieNetwork::ALL {
        let state = patient.network_state(network);
        let status = match state.and_then(|s| s.discovery_status) {
            Some(crate::domain::DiscoveryStatus::Completed) => "✅ completed",
            Some(crate::domain::DiscoveryStatus::Processing) => "🔄 processing",
            Some(crate::domain::DiscoveryStatus::Failed) => "❌ failed",
            None => "⏸️  never run",
        };
        let params = state.and_then(|s| s.discovery_params.as_ref());
        let request_id = params.map(|p| p.request_id.to_string()).unwrap_or_default();
        let started = params
            .map(|p| p.started_at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let scheduled_pd = state
            .and_then(|s| s.scheduled_pd_request.as_ref())
            .map(|r| r.request_id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let scheduled_dq = state
            .and_then(|s| s.scheduled_doc_query_request_id.as_ref())
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<13} {:<14} {:<38} {:<21} {:<38} {:<38}",
            network.as_str(),
            status,
            request_id,
            started,
            scheduled_pd,
            scheduled_dq
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_key_rejects_blank_ids() {
        assert!(patient_key("cx", "pt").is_ok());
        assert!(patient_key(" ", "pt").is_err());
        assert!(patient_key("cx", "").is_err());
    }
}
