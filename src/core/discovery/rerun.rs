//! Re-running discovery on new demographics
//!
//! A run started with `rerun_pd_on_new_demographics` checks the demographics
//! its links carry before settling. When a link brings demographics the
//! patient record does not know yet, they are recorded on the network and a
//! fresh run starts in place of the settlement. The fresh run has the flag
//! off, so a patient is re-run at most once per request.

use super::coordinator::DiscoveryCoordinator;
use crate::domain::{DiscoveryRequest, HieNetwork, PatientDemographics, PatientKey, RequestId};
use std::sync::Arc;

impl DiscoveryCoordinator {
    /// Start a fresh run when `network`'s links carry new demographics
    ///
    /// Returns `true` when the fresh run started; the finishing run must then
    /// not be settled. Errors are captured and reported as `false`.
    pub(super) async fn rerun_on_new_demographics(
        self: &Arc<Self>,
        network: HieNetwork,
        key: &PatientKey,
        request: &DiscoveryRequest,
    ) -> bool {
        let mut found: Vec<PatientDemographics> = Vec::new();
        let recorded = {
            let found = &mut found;
            self.store
                .update_external_data(
                    key,
                    Box::new(move |record| {
                        let new = record
                            .external_data
                            .new_link_demographics(network, &record.demographics);
                        record
                            .external_data
                            .entry_mut(network)
                            .links_demographics
                            .extend(new.iter().cloned());
                        *found = new;
                        Ok(())
                    }),
                )
                .await
        };

        let patient = match recorded {
            Ok(patient) => patient,
            Err(e) => {
                self.capture(network, key, "rerun_on_new_demographics", &e);
                return false;
            }
        };
        if found.is_empty() {
            return false;
        }

        let rerun = DiscoveryRequest {
            request_id: RequestId::generate(),
            rerun_pd_on_new_demographics: false,
            ..request.clone()
        };
        tracing::info!(
            event = "rerun_on_new_demographics",
            network = %network,
            cx_id = %key.cx_id,
            patient_id = %key.patient_id,
            request_id = %request.request_id,
            rerun_request_id = %rerun.request_id,
            new_demographics = found.len(),
            "Links carry new demographics, re-running patient discovery"
        );

        match self.launch(network, &patient, rerun).await {
            Ok(()) => true,
            Err(e) => {
                self.capture(network, key, "rerun_on_new_demographics", &e);
                false
            }
        }
    }
}
