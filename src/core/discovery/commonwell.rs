//! CommonWell discovery driver: register the patient, then read its links

use super::driver::DiscoveryDriver;
use crate::adapters::database::PatientRecordStore;
use crate::adapters::hie::CommonWellClient;
use crate::core::retry::{execute_with_retries_safe, RetryPolicy};
use crate::domain::{DiscoveryRequest, HieError, HieNetwork, NetworkLink, PatientRecord, Result};
use crate::logging::{ErrorContext, ObservabilitySink};
use async_trait::async_trait;
use std::sync::Arc;

pub struct CommonWellDriver {
    client: Arc<dyn CommonWellClient>,
    store: Arc<dyn PatientRecordStore>,
    retry: RetryPolicy,
    sink: Arc<dyn ObservabilitySink>,
}

impl CommonWellDriver {
    pub fn new(
        client: Arc<dyn CommonWellClient>,
        store: Arc<dyn PatientRecordStore>,
        retry: RetryPolicy,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Self {
        Self {
            client,
            store,
            retry,
            sink,
        }
    }
}

fn is_retryable(error: &HieError) -> bool {
    matches!(error, HieError::Gateway(e) if e.is_transient())
}

#[async_trait]
impl DiscoveryDriver for CommonWellDriver {
    fn network(&self) -> HieNetwork {
        HieNetwork::CommonWell
    }

    async fn discover(&self, patient: &PatientRecord, request: &DiscoveryRequest) -> Result<()> {
        let network_patient_id = self
            .client
            .register_patient(patient, &request.facility_id)
            .await?;

        // Link retrieval is an idempotent read; when it keeps failing the
        // run still completes with the registration alone
        let client = &self.client;
        let id = network_patient_id.as_str();
        let context = ErrorContext::new("cw.get_patient_links")
            .with_patient(&patient.cx_id, &patient.patient_id)
            .with_network(HieNetwork::CommonWell)
            .with_request_id(&request.request_id);
        let links: Option<Vec<NetworkLink>> = execute_with_retries_safe(
            &self.retry,
            "cw.get_patient_links",
            || async move { client.get_patient_links(id).await },
            is_retryable,
            self.sink.as_ref(),
            &context,
        )
        .await
        .map(|links| {
            links
                .into_iter()
                .filter(|l| !l.org_id.as_deref().is_some_and(|org| request.is_org_excluded(org)))
                .map(NetworkLink::from)
                .collect()
        });

        let link_count = links.as_ref().map(Vec::len);
        let stored_id = network_patient_id.clone();
        self.store
            .update_external_data(
                &patient.key(),
                Box::new(move |record| {
                    let state = record.external_data.entry_mut(HieNetwork::CommonWell);
                    state.network_patient_id = Some(stored_id);
                    if let Some(links) = links {
                        state.links = links;
                    }
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(
            cx_id = %patient.cx_id,
            patient_id = %patient.patient_id,
            request_id = %request.request_id,
            network_patient_id = %network_patient_id,
            links = ?link_count,
            "CommonWell discovery finished"
        );
        Ok(())
    }
}
