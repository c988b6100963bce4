//! Discovery status transitions
//!
//! The tracker is the only writer of `discovery_status`. Both transitions
//! run as a locked read-modify-write through the store.

use crate::adapters::database::PatientRecordStore;
use crate::domain::{
    DiscoveryParams, DiscoveryStatus, HieError, HieNetwork, PatientKey, PatientRecord, RequestId,
    Result, ScheduledDiscoveryRequest,
};
use std::sync::Arc;

/// A document query deferred until discovery settles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledDocQuery {
    pub request_id: RequestId,
    pub trigger_consolidated: bool,
}

/// Result of a status update
///
/// On a terminal status both pending schedules are taken off the record in
/// the same transaction that wrote the status, so each is handed to exactly
/// one caller.
#[derive(Debug, Clone)]
pub struct StatusTransition {
    pub patient: PatientRecord,
    pub scheduled_pd_request: Option<ScheduledDiscoveryRequest>,
    pub scheduled_doc_query: Option<ScheduledDocQuery>,
}

/// Reads and writes per-network discovery status
#[derive(Clone)]
pub struct StatusTracker {
    store: Arc<dyn PatientRecordStore>,
}

impl StatusTracker {
    pub fn new(store: Arc<dyn PatientRecordStore>) -> Self {
        Self { store }
    }

    /// Current status of a network, `None` if discovery never ran
    pub async fn get_status(
        &self,
        network: HieNetwork,
        key: &PatientKey,
    ) -> Result<Option<DiscoveryStatus>> {
        let patient = self.store.get_patient(key).await?;
        Ok(patient.external_data.status(network))
    }

    /// Start transition: mark the network as processing with fresh params
    pub async fn start_discovery(
        &self,
        network: HieNetwork,
        key: &PatientKey,
        params: DiscoveryParams,
    ) -> Result<PatientRecord> {
        let request_id = params.request_id.clone();
        let patient = self
            .store
            .update_external_data(
                key,
                Box::new(move |record| {
                    let state = record.external_data.entry_mut(network);
                    state.discovery_status = Some(DiscoveryStatus::Processing);
                    state.discovery_params = Some(params);
                    Ok(())
                }),
            )
            .await?;

        tracing::debug!(
            network = %network,
            cx_id = %key.cx_id,
            patient_id = %key.patient_id,
            request_id = %request_id,
            status = "processing",
            "Discovery status updated"
        );
        Ok(patient)
    }

    /// Write `status`, optionally replacing the discovery params
    ///
    /// # Errors
    ///
    /// Returns `HieError::MissingDiscoveryParams` when the network has no
    /// params and none are given, and `HieError::PatientNotFound` when the
    /// record does not exist. Nothing is written in either case.
    pub async fn update_status(
        &self,
        network: HieNetwork,
        key: &PatientKey,
        status: DiscoveryStatus,
        params: Option<DiscoveryParams>,
    ) -> Result<StatusTransition> {
        let mut scheduled_pd_request = None;
        let mut scheduled_doc_query = None;

        let patient = {
            let taken_pd = &mut scheduled_pd_request;
            let taken_dq = &mut scheduled_doc_query;
            self.store
                .update_external_data(
                    key,
                    Box::new(move |record| {
                        let state = record.external_data.entry_mut(network);
                        if let Some(params) = params {
                            state.discovery_params = Some(params);
                        }
                        if state.discovery_params.is_none() {
                            return Err(HieError::MissingDiscoveryParams { network });
                        }
                        state.discovery_status = Some(status);

                        if status.is_terminal() {
                            *taken_pd = state.scheduled_pd_request.take();
                            *taken_dq = state.scheduled_doc_query_request_id.take().map(
                                |request_id| ScheduledDocQuery {
                                    request_id,
                                    trigger_consolidated: state
                                        .scheduled_doc_query_trigger_consolidated,
                                },
                            );
                            state.scheduled_doc_query_trigger_consolidated = false;
                        }
                        Ok(())
                    }),
                )
                .await?
        };

        tracing::debug!(
            network = %network,
            cx_id = %key.cx_id,
            patient_id = %key.patient_id,
            status = %status,
            took_scheduled_pd = scheduled_pd_request.is_some(),
            took_scheduled_dq = scheduled_doc_query.is_some(),
            "Discovery status updated"
        );

        Ok(StatusTransition {
            patient,
            scheduled_pd_request,
            scheduled_doc_query,
        })
    }
}
