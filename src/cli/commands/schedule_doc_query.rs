//! Schedule-doc-query command implementation
//!
//! Defers a document query behind discovery on one network, and starts
//! discovery alongside it when the scheduler asks for it.

use super::{connect, patient_key, wait_for_settle, EXIT_CONFIG, EXIT_FATAL, EXIT_OK};
use crate::core::doc_query::DocQueryOptions;
use crate::domain::{
    DiscoveryRequest, FacilityId, HieNetwork, PatientRecord, RequestId,
};
use clap::Args;
use std::time::Duration;
use tokio::sync::watch;

/// Arguments for the schedule-doc-query command
#[derive(Args, Debug)]
pub struct ScheduleDocQueryArgs {
    /// Customer ID
    #[arg(long)]
    pub cx_id: String,

    /// Patient ID
    #[arg(long)]
    pub patient_id: String,

    /// Network (carequality | cq | commonwell | cw)
    #[arg(long)]
    pub network: HieNetwork,

    /// Document query request ID
    #[arg(long)]
    pub request_id: String,

    /// Facility for a discovery started alongside (defaults to the last
    /// discovery's facility, then the patient's first facility)
    #[arg(long)]
    pub facility_id: Option<String>,

    /// Schedule even when discovery is settled and fresh
    #[arg(long)]
    pub force_scheduling: bool,

    /// Start discovery alongside the scheduled query
    #[arg(long)]
    pub force_discovery: bool,

    /// Trigger consolidated data refresh once the query completes
    #[arg(long)]
    pub trigger_consolidated: bool,

    /// Seconds to wait for a discovery started alongside to settle
    ///
    /// Runs still in flight afterwards are settled as failed.
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    pub wait_seconds: u64,
}

impl ScheduleDocQueryArgs {
    fn options(&self) -> DocQueryOptions {
        DocQueryOptions {
            force_scheduling: self.force_scheduling,
            force_patient_discovery: self.force_discovery,
            trigger_consolidated: self.trigger_consolidated,
        }
    }

    fn discovery_facility(&self, patient: &PatientRecord) -> Result<FacilityId, String> {
        if let Some(facility) = &self.facility_id {
            return FacilityId::new(facility.as_str());
        }
        patient
            .network_state(self.network)
            .and_then(|s| s.discovery_params.as_ref())
            .map(|p| p.facility_id.clone())
            .or_else(|| patient.facility_ids.first().cloned())
            .ok_or_else(|| "no facility known for the patient; pass --facility-id".to_string())
    }

    /// Discovery started alongside the query, correlated with it through
    /// the query's request ID
    fn discovery_request(
        &self,
        request_id: &RequestId,
        patient: &PatientRecord,
    ) -> Result<DiscoveryRequest, String> {
        Ok(DiscoveryRequest::new(
            request_id.clone(),
            self.discovery_facility(patient)?,
        ))
    }

    /// Execute the schedule-doc-query command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let parsed = patient_key(&self.cx_id, &self.patient_id)
            .and_then(|key| Ok((key, RequestId::new(self.request_id.as_str())?)));
        let (key, request_id) = match parsed {
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

        println!("📄 Document query {} on {} for {}", request_id, self.network, key);

        let decision = match runtime
            .doc_query_scheduler
            .schedule_doc_query(&key, self.network, &request_id, self.options())
            .await
        {
            Ok(d) => d,
            Err(e) => {
                println!("❌ Failed to schedule document query");
                println!("   Error: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        if !decision.is_scheduled {
            println!("✅ Discovery is settled and fresh; query can run immediately");
            return Ok(EXIT_OK);
        }
        println!("✅ Document query deferred until discovery settles");

        if decision.run_discovery_now {
            let patient = runtime.store.get_patient(&key).await?;
            let request = match self.discovery_request(&request_id, &patient) {
                Ok(r) => r,
                Err(e) => {
                    println!("❌ Cannot start discovery: {e}");
                    return Ok(EXIT_CONFIG);
                }
            };
            match runtime
                .coordinator
                .run_or_schedule(self.network, &key, request)
                .await
            {
                Ok(outcome) => println!("🔎 Discovery {}", outcome.as_str()),
                Err(e) => {
                    println!("❌ Failed to start discovery");
                    println!("   Error: {e}");
                    return Ok(EXIT_FATAL);
                }
            }

            let settled = wait_for_settle(
                &runtime.coordinator,
                Duration::from_secs(self.wait_seconds),
                shutdown_signal,
            )
            .await;
            if !settled {
                println!("⚠️  Discovery did not settle in time");
            }
        }

        Ok(EXIT_OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::domain::{CxId, DiscoveryParams, PatientId};
    use chrono::Utc;
    use clap::Parser;

    fn args(extra: &[&str]) -> ScheduleDocQueryArgs {
        let mut argv = vec![
            "hie-orchestrator",
            "schedule-doc-query",
            "--cx-id",
            "cx",
            "--patient-id",
            "pt",
            "--network",
            "cw",
            "--request-id",
            "dq-1",
        ];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::ScheduleDocQuery(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_network_alias_and_options() {
        let args = args(&["--force-discovery", "--trigger-consolidated"]);
        assert_eq!(args.network, HieNetwork::CommonWell);
        let options = args.options();
        assert!(options.force_patient_discovery);
        assert!(options.trigger_consolidated);
        assert!(!options.force_scheduling);
    }

    #[test]
    fn test_discovery_facility_fallbacks() {
        let args = args(&[]);
        let patient =
            PatientRecord::new(CxId::new("cx").unwrap(), PatientId::new("pt").unwrap(), Utc::now());
        assert!(args.discovery_facility(&patient).is_err());

        let mut patient = patient.with_facility(FacilityId::new("first").unwrap());
        assert_eq!(args.discovery_facility(&patient).unwrap().as_str(), "first");

        patient
            .external_data
            .entry_mut(HieNetwork::CommonWell)
            .discovery_params = Some(DiscoveryParams {
            request_id: RequestId::new("r").unwrap(),
            facility_id: FacilityId::new("last-run").unwrap(),
            started_at: Utc::now(),
            rerun_pd_on_new_demographics: false,
        });
        assert_eq!(args.discovery_facility(&patient).unwrap().as_str(), "last-run");
    }

    #[test]
    fn test_discovery_reuses_query_request_id() {
        let args = args(&["--facility-id", "fac-9"]);
        let patient =
            PatientRecord::new(CxId::new("cx").unwrap(), PatientId::new("pt").unwrap(), Utc::now());

        let request = args
            .discovery_request(&RequestId::new("dq-1").unwrap(), &patient)
            .unwrap();
        assert_eq!(request.request_id.as_str(), "dq-1");
        assert_eq!(request.facility_id.as_str(), "fac-9");
        assert!(!request.rerun_pd_on_new_demographics);
    }

    #[test]
    fn test_zero_wait_is_rejected() {
        let parsed = Cli::try_parse_from([
            "hie-orchestrator",
            "schedule-doc-query",
            "--cx-id",
            "cx",
            "--patient-id",
            "pt",
            "--network",
            "cw",
            "--request-id",
            "dq-1",
            "--wait-seconds",
            "0",
        ]);
        assert!(parsed.is_err());
    }
}
