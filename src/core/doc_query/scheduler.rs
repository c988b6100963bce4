//! Deferring document queries behind discovery
//!
//! A document query is parked on the network state when discovery never
//! ran, is running, or is stale, or when the caller forces it. Progress
//! processing picks it up once discovery settles.

use super::flags::FeatureFlags;
use crate::adapters::database::PatientRecordStore;
use crate::config::DiscoveryConfig;
use crate::domain::{HieNetwork, NetworkDiscoveryState, PatientKey, RequestId, Result};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Caller overrides for [`DocQueryScheduler::schedule_doc_query`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocQueryOptions {
    pub force_scheduling: bool,
    pub force_patient_discovery: bool,
    pub trigger_consolidated: bool,
}

/// Scheduling decision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocQuerySchedule {
    pub is_scheduled: bool,
    /// Discovery should be started alongside the deferred query
    pub run_discovery_now: bool,
}

/// Inputs of the scheduling policy, read inside the lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DocQueryInputs {
    pub has_no_status: bool,
    pub is_processing: bool,
    pub is_stale: bool,
}

pub(crate) fn evaluate(inputs: DocQueryInputs, options: &DocQueryOptions) -> DocQuerySchedule {
    let is_scheduled = inputs.has_no_status
        || inputs.is_processing
        || inputs.is_stale
        || options.force_scheduling;
    if !is_scheduled {
        return DocQuerySchedule::default();
    }
    DocQuerySchedule {
        is_scheduled,
        run_discovery_now: (options.force_patient_discovery || inputs.is_stale)
            && !inputs.is_processing,
    }
}

/// Staleness policy
#[derive(Debug, Clone)]
pub struct StalenessPolicy {
    flags: FeatureFlags,
    lookback: Duration,
}

impl StalenessPolicy {
    pub fn new(flags: FeatureFlags, lookback: Duration) -> Self {
        Self { flags, lookback }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(
            FeatureFlags::from_config(config),
            Duration::hours(i64::from(config.stale_lookback_hours)),
        )
    }

    /// Stale when the check is on for the customer and the last discovery
    /// start, or the record creation when discovery never ran, is older
    /// than the lookback window
    pub fn is_stale(
        &self,
        key: &PatientKey,
        state: Option<&NetworkDiscoveryState>,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.flags.is_stale_check_enabled(&key.cx_id) {
            return false;
        }
        let reference = state.and_then(|s| s.started_at()).unwrap_or(created_at);
        reference < now - self.lookback
    }
}

/// Decides whether a document query waits for discovery
pub struct DocQueryScheduler {
    store: Arc<dyn PatientRecordStore>,
    staleness: StalenessPolicy,
}

impl DocQueryScheduler {
    pub fn new(store: Arc<dyn PatientRecordStore>, staleness: StalenessPolicy) -> Self {
        Self { store, staleness }
    }

    /// Park the document query on the network state if discovery is not
    /// settled and fresh
    ///
    /// The decision inputs are read inside the patient row lock.
    pub async fn schedule_doc_query(
        &self,
        key: &PatientKey,
        network: HieNetwork,
        request_id: &RequestId,
        options: DocQueryOptions,
    ) -> Result<DocQuerySchedule> {
        let now = Utc::now();
        let mut decision = DocQuerySchedule::default();

        {
            let decision = &mut decision;
            let staleness = &self.staleness;
            let request_id = request_id.clone();
            self.store
                .update_external_data(
                    key,
                    Box::new(move |record| {
                        let state = record.external_data.get(network);
                        let inputs = DocQueryInputs {
                            has_no_status: state.map_or(true, |s| s.has_no_status()),
                            is_processing: state.is_some_and(|s| s.is_processing()),
                            is_stale: staleness.is_stale(key, state, record.created_at, now),
                        };
                        *decision = evaluate(inputs, &options);

                        if decision.is_scheduled {
                            let state = record.external_data.entry_mut(network);
                            state.scheduled_doc_query_request_id = Some(request_id);
                            state.scheduled_doc_query_trigger_consolidated =
                                options.trigger_consolidated;
                        }
                        Ok(())
                    }),
                )
                .await?;
        }

        tracing::info!(
            network = %network,
            cx_id = %key.cx_id,
            patient_id = %key.patient_id,
            request_id = %request_id,
            is_scheduled = decision.is_scheduled,
            run_discovery_now = decision.run_discovery_now,
            "Document query scheduling evaluated"
        );
        Ok(decision)
    }
}
