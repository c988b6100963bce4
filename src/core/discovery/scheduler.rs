//! Pending discovery schedule
//!
//! A network holds at most one scheduled discovery request. Scheduling
//! overwrites whatever is there; resetting an empty schedule is a no-op.
//! Run-or-schedule writes through [`DiscoveryScheduler::schedule_while_processing`],
//! which repeats the decision under the lock.

use super::decision::{decide, Decision};
use crate::adapters::database::PatientRecordStore;
use crate::domain::{HieNetwork, PatientKey, PatientRecord, Result, ScheduledDiscoveryRequest};
use std::sync::Arc;

/// Writes and clears `scheduled_pd_request` under the patient row lock
#[derive(Clone)]
pub struct DiscoveryScheduler {
    store: Arc<dyn PatientRecordStore>,
}

impl DiscoveryScheduler {
    pub fn new(store: Arc<dyn PatientRecordStore>) -> Self {
        Self { store }
    }

    /// Store `request` as the next discovery to run for `network`
    ///
    /// Last writer wins. Other networks and fields are re-read inside the
    /// lock and left as they are.
    pub async fn schedule(
        &self,
        network: HieNetwork,
        key: &PatientKey,
        request: ScheduledDiscoveryRequest,
    ) -> Result<PatientRecord> {
        let request_id = request.request_id.clone();
        let patient = self
            .store
            .update_external_data(
                key,
                Box::new(move |record| {
                    record.external_data.entry_mut(network).scheduled_pd_request = Some(request);
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(
            network = %network,
            cx_id = %key.cx_id,
            patient_id = %key.patient_id,
            request_id = %request_id,
            "Patient discovery scheduled"
        );
        Ok(patient)
    }

    /// Store `request` only if `network` is still processing without a
    /// pending request
    ///
    /// The decision is taken again on the locked record and returned. Only
    /// `Decision::Schedule` writes; `Decision::RunNow` means the run settled
    /// since the caller looked, and `Decision::KeepExisting` that another
    /// request got scheduled first.
    pub async fn schedule_while_processing(
        &self,
        network: HieNetwork,
        key: &PatientKey,
        request: ScheduledDiscoveryRequest,
    ) -> Result<Decision> {
        let request_id = request.request_id.clone();
        let mut decision = Decision::Schedule;
        {
            let decided = &mut decision;
            self.store
                .update_external_data(
                    key,
                    Box::new(move |record| {
                        let data = &record.external_data;
                        *decided = decide(data.status(network), data.scheduled_pd_request(network));
                        if *decided == Decision::Schedule {
                            record.external_data.entry_mut(network).scheduled_pd_request =
                                Some(request);
                        }
                        Ok(())
                    }),
                )
                .await?;
        }

        if decision == Decision::Schedule {
            tracing::info!(
                network = %network,
                cx_id = %key.cx_id,
                patient_id = %key.patient_id,
                request_id = %request_id,
                "Patient discovery scheduled"
            );
        }
        Ok(decision)
    }

    /// Clear the scheduled request of `network`
    pub async fn reset_scheduled_patient_discovery(
        &self,
        network: HieNetwork,
        key: &PatientKey,
    ) -> Result<PatientRecord> {
        let patient = self
            .store
            .update_external_data(
                key,
                Box::new(move |record| {
                    if let Some(state) = record.external_data.get(network) {
                        if state.scheduled_pd_request.is_some() {
                            record.external_data.entry_mut(network).scheduled_pd_request = None;
                        }
                    }
                    Ok(())
                }),
            )
            .await?;

        tracing::debug!(
            network = %network,
            cx_id = %key.cx_id,
            patient_id = %key.patient_id,
            "Scheduled patient discovery reset"
        );
        Ok(patient)
    }
}
