//! Progress processing
//!
//! Called whenever a discovery run changes status, most often from the
//! settlement of a driver task. On a terminal status the deferred document
//! query and the scheduled discovery are each consumed exactly once:
//!
//! | Pending item        | Completed              | Failed                  |
//! |---------------------|------------------------|-------------------------|
//! | Document query      | started (detached)     | marked failed           |
//! | Scheduled discovery | launched               | dropped, not retried    |
//!
//! Progress processing never returns an error. Everything that goes wrong
//! is logged and captured through the observability sink.

use super::coordinator::DiscoveryCoordinator;
use super::status::ScheduledDocQuery;
use crate::core::tasks::spawn_detached;
use crate::domain::{
    DiscoveryStatus, DocQueryProgressUpdate, HieError, HieNetwork, PatientKey, PatientRecord,
    Result, ScheduledDiscoveryRequest,
};
use crate::logging::ErrorContext;
use std::sync::Arc;

impl DiscoveryCoordinator {
    /// Record `status` for `network` and chain whatever was waiting on it
    ///
    /// Returns the updated record, or `None` when the status could not be
    /// written (the error has already been captured).
    pub async fn process_discovery_progress(
        self: &Arc<Self>,
        network: HieNetwork,
        key: &PatientKey,
        status: DiscoveryStatus,
    ) -> Option<PatientRecord> {
        match self.apply_progress(network, key, status).await {
            Ok(patient) => Some(patient),
            Err(e) => {
                self.capture(network, key, "process_discovery_progress", &e);
                None
            }
        }
    }

    async fn apply_progress(
        self: &Arc<Self>,
        network: HieNetwork,
        key: &PatientKey,
        status: DiscoveryStatus,
    ) -> Result<PatientRecord> {
        let transition = self.tracker.update_status(network, key, status, None).await?;
        let patient = transition.patient;

        if let Some(doc_query) = transition.scheduled_doc_query {
            self.settle_doc_query(network, &patient, doc_query, status).await;
        }
        if let Some(scheduled) = transition.scheduled_pd_request {
            self.settle_scheduled_discovery(network, &patient, scheduled, status)
                .await;
        }

        Ok(patient)
    }

    async fn settle_doc_query(
        self: &Arc<Self>,
        network: HieNetwork,
        patient: &PatientRecord,
        doc_query: ScheduledDocQuery,
        status: DiscoveryStatus,
    ) {
        match status {
            DiscoveryStatus::Completed => {
                tracing::info!(
                    network = %network,
                    cx_id = %patient.cx_id,
                    patient_id = %patient.patient_id,
                    request_id = %doc_query.request_id,
                    "Starting deferred document query"
                );
                let trigger = Arc::clone(&self.doc_query);
                let coordinator = Arc::clone(self);
                let patient = patient.clone();
                self.track(spawn_detached("deferred_document_query", async move {
                    let started = trigger
                        .start_document_query(
                            &patient,
                            network,
                            &doc_query.request_id,
                            doc_query.trigger_consolidated,
                        )
                        .await;
                    if let Err(e) = &started {
                        coordinator.capture(
                            network,
                            &patient.key(),
                            "doc_query.start",
                            e,
                        );
                    }
                    started
                }));
            }
            DiscoveryStatus::Failed => {
                let result = self
                    .doc_query
                    .set_doc_query_progress(
                        patient,
                        &doc_query.request_id,
                        network,
                        DocQueryProgressUpdate::failed(),
                    )
                    .await;
                if let Err(e) = result {
                    self.capture(network, &patient.key(), "doc_query.set_progress", &e);
                }
            }
            DiscoveryStatus::Processing => {}
        }
    }

    async fn settle_scheduled_discovery(
        self: &Arc<Self>,
        network: HieNetwork,
        patient: &PatientRecord,
        scheduled: ScheduledDiscoveryRequest,
        status: DiscoveryStatus,
    ) {
        let finished_request_id = patient
            .network_state(network)
            .and_then(|s| s.discovery_params.as_ref())
            .map(|p| p.request_id.to_string())
            .unwrap_or_default();

        match status {
            DiscoveryStatus::Completed => {
                tracing::info!(
                    event = "run_scheduled_patient_discovery",
                    network = %network,
                    cx_id = %patient.cx_id,
                    patient_id = %patient.patient_id,
                    request_id = %finished_request_id,
                    scheduled_request_id = %scheduled.request_id,
                    "Running scheduled patient discovery"
                );
                if let Err(e) = self.launch(network, patient, scheduled).await {
                    self.capture(network, &patient.key(), "run_scheduled_patient_discovery", &e);
                }
            }
            DiscoveryStatus::Failed => {
                tracing::info!(
                    event = "skip_scheduled_patient_discovery",
                    network = %network,
                    cx_id = %patient.cx_id,
                    patient_id = %patient.patient_id,
                    request_id = %finished_request_id,
                    scheduled_request_id = %scheduled.request_id,
                    "Discovery failed, scheduled discovery dropped"
                );
            }
            DiscoveryStatus::Processing => {}
        }
    }

    pub(super) fn capture(
        &self,
        network: HieNetwork,
        key: &PatientKey,
        operation: &str,
        error: &HieError,
    ) {
        self.sink.capture_error(
            error,
            &ErrorContext::new(format!("{}.{}", network.short_code(), operation))
                .with_patient(&key.cx_id, &key.patient_id)
                .with_network(network),
        );
    }
}
