//! Cross-network discovery
//!
//! Fans one discovery request out to every registered network. Each network
//! is handled in its own failure domain: an error on one never prevents or
//! cancels the other, and no lock spans both.

use super::coordinator::DiscoveryCoordinator;
use super::decision::RunOrScheduleOutcome;
use crate::domain::{
    DiscoveryRequest, FacilityId, HieNetwork, PatientKey, PatientRecord, RequestId,
    RequestIdGenerator, Result, UuidV7Generator,
};
use crate::logging::ErrorContext;
use futures::future::join_all;
use std::sync::Arc;

/// Options shared by both networks of a cross-network request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryFlags {
    pub rerun_pd_on_new_demographics: bool,
    pub org_id_exclude_list: Option<Vec<String>>,
    pub force_carequality: bool,
    pub force_commonwell: bool,
}

impl DiscoveryFlags {
    fn forces(&self, network: HieNetwork) -> bool {
        match network {
            HieNetwork::Carequality => self.force_carequality,
            HieNetwork::CommonWell => self.force_commonwell,
        }
    }

    fn request_for(
        &self,
        network: HieNetwork,
        request_id: &RequestId,
        facility_id: &FacilityId,
    ) -> DiscoveryRequest {
        let request = DiscoveryRequest::new(request_id.clone(), facility_id.clone())
            .with_rerun_pd_on_new_demographics(self.rerun_pd_on_new_demographics)
            .with_force_enabled(self.forces(network));
        match &self.org_id_exclude_list {
            Some(list) => request.with_org_id_exclude_list(list.clone()),
            None => request,
        }
    }
}

/// Per-network result of a cross-network call
#[derive(Debug)]
pub struct NetworkDispatch {
    pub network: HieNetwork,
    pub outcome: Result<RunOrScheduleOutcome>,
}

/// Result of a cross-network call
#[derive(Debug)]
pub struct CrossNetworkReport {
    /// Request ID shared by every network
    pub request_id: RequestId,
    pub dispatches: Vec<NetworkDispatch>,
}

impl CrossNetworkReport {
    pub fn outcome(&self, network: HieNetwork) -> Option<&Result<RunOrScheduleOutcome>> {
        self.dispatches
            .iter()
            .find(|d| d.network == network)
            .map(|d| &d.outcome)
    }

    pub fn failures(&self) -> usize {
        self.dispatches.iter().filter(|d| d.outcome.is_err()).count()
    }
}

/// Fans discovery out across networks
pub struct CrossHieOrchestrator {
    coordinator: Arc<DiscoveryCoordinator>,
    id_generator: Arc<dyn RequestIdGenerator>,
}

impl CrossHieOrchestrator {
    pub fn new(coordinator: Arc<DiscoveryCoordinator>) -> Self {
        Self::with_id_generator(coordinator, Arc::new(UuidV7Generator))
    }

    pub fn with_id_generator(
        coordinator: Arc<DiscoveryCoordinator>,
        id_generator: Arc<dyn RequestIdGenerator>,
    ) -> Self {
        Self {
            coordinator,
            id_generator,
        }
    }

    pub fn coordinator(&self) -> &Arc<DiscoveryCoordinator> {
        &self.coordinator
    }

    /// Networks a request with `flags` is dispatched to
    fn target_networks(&self, flags: &DiscoveryFlags) -> Vec<HieNetwork> {
        self.coordinator
            .networks()
            .into_iter()
            .filter(|&network| self.coordinator.is_enabled(network) || flags.forces(network))
            .collect()
    }

    /// Start discovery on every network without looking at prior state
    ///
    /// For brand-new patients. Every network gets the same request ID.
    pub async fn run_initial_discovery_across_networks(
        &self,
        patient: &PatientRecord,
        facility_id: &FacilityId,
        flags: &DiscoveryFlags,
        request_id: Option<RequestId>,
    ) -> CrossNetworkReport {
        let request_id = request_id.unwrap_or_else(|| self.id_generator.next_id());
        let key = &patient.key();
        let shared_id = &request_id;

        let launches = self.target_networks(flags).into_iter().map(|network| {
            let request = flags.request_for(network, shared_id, facility_id);
            async move {
                let outcome = self
                    .coordinator
                    .launch(network, patient, request)
                    .await
                    .map(|()| RunOrScheduleOutcome::Started);
                self.report(network, key, shared_id, "initial_discovery", outcome)
            }
        });
        let dispatches = join_all(launches).await;

        CrossNetworkReport {
            request_id,
            dispatches,
        }
    }

    /// Run or schedule discovery on every network under one request ID
    ///
    /// A fresh time-ordered ID is generated when none is given.
    pub async fn run_or_schedule_across_networks(
        &self,
        key: &PatientKey,
        facility_id: &FacilityId,
        flags: &DiscoveryFlags,
        request_id: Option<RequestId>,
    ) -> CrossNetworkReport {
        let request_id = request_id.unwrap_or_else(|| self.id_generator.next_id());
        let shared_id = &request_id;

        let decisions = self.target_networks(flags).into_iter().map(|network| {
            let request = flags.request_for(network, shared_id, facility_id);
            async move {
                let outcome = self
                    .coordinator
                    .run_or_schedule(network, key, request)
                    .await;
                self.report(network, key, shared_id, "run_or_schedule", outcome)
            }
        });
        let dispatches = join_all(decisions).await;

        CrossNetworkReport {
            request_id,
            dispatches,
        }
    }

    fn report(
        &self,
        network: HieNetwork,
        key: &PatientKey,
        request_id: &RequestId,
        operation: &str,
        outcome: Result<RunOrScheduleOutcome>,
    ) -> NetworkDispatch {
        match &outcome {
            Ok(result) => tracing::info!(
                network = %network,
                cx_id = %key.cx_id,
                patient_id = %key.patient_id,
                request_id = %request_id,
                outcome = result.as_str(),
                "Discovery dispatched"
            ),
            Err(e) => self.coordinator.sink.capture_error(
                e,
                &ErrorContext::new(format!("{}.{}", network.short_code(), operation))
                    .with_patient(&key.cx_id, &key.patient_id)
                    .with_network(network)
                    .with_request_id(request_id),
            ),
        }
        NetworkDispatch { network, outcome }
    }
}
