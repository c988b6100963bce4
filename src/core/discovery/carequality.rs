//! Carequality discovery driver: gateway fan-out, poll, aggregate

use super::driver::DiscoveryDriver;
use super::poller::ResultPoller;
use crate::adapters::database::PatientRecordStore;
use crate::adapters::hie::{CarequalityGateway, OutboundDiscoveryRequest, OutboundDiscoveryResponse};
use crate::domain::{DiscoveryRequest, HieNetwork, NetworkLink, PatientRecord, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub struct CarequalityDriver {
    gateway: Arc<dyn CarequalityGateway>,
    poller: Arc<dyn ResultPoller>,
    store: Arc<dyn PatientRecordStore>,
}

impl CarequalityDriver {
    pub fn new(
        gateway: Arc<dyn CarequalityGateway>,
        poller: Arc<dyn ResultPoller>,
        store: Arc<dyn PatientRecordStore>,
    ) -> Self {
        Self {
            gateway,
            poller,
            store,
        }
    }
}

/// Links from matched responses, minus excluded organizations
fn collect_links(
    responses: &[OutboundDiscoveryResponse],
    request: &DiscoveryRequest,
) -> Vec<NetworkLink> {
    responses
        .iter()
        .filter(|r| !request.is_org_excluded(&r.gateway_org_id))
        .filter_map(OutboundDiscoveryResponse::to_link)
        .collect()
}

#[async_trait]
impl DiscoveryDriver for CarequalityDriver {
    fn network(&self) -> HieNetwork {
        HieNetwork::Carequality
    }

    async fn discover(&self, patient: &PatientRecord, request: &DiscoveryRequest) -> Result<()> {
        let outbound = OutboundDiscoveryRequest {
            request_id: request.request_id.clone(),
            cx_id: patient.cx_id.clone(),
            patient_id: patient.patient_id.clone(),
            facility_id: request.facility_id.clone(),
            demographics: patient.demographics.clone(),
            excluded_org_ids: request.org_id_exclude_list.clone().unwrap_or_default(),
        };

        let contacted = self.gateway.start_outbound_discovery(&outbound).await?;
        let responses = if contacted == 0 {
            Vec::new()
        } else {
            self.poller
                .wait_for(self.gateway.as_ref(), &request.request_id, contacted)
                .await?
        };

        let links = collect_links(&responses, request);
        let link_count = links.len();

        self.store
            .update_external_data(
                &patient.key(),
                Box::new(move |record| {
                    record.external_data.entry_mut(HieNetwork::Carequality).links = links;
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(
            cx_id = %patient.cx_id,
            patient_id = %patient.patient_id,
            request_id = %request.request_id,
            gateways_contacted = contacted,
            responses = responses.len(),
            links = link_count,
            "Carequality discovery finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::hie::ExternalPatient;
    use crate::adapters::memory::InMemoryPatientStore;
    use crate::domain::{CxId, FacilityId, PatientId, RequestId};
    use chrono::Utc;
    use std::sync::Mutex;

    fn matched(org: &str, id: &str) -> OutboundDiscoveryResponse {
        OutboundDiscoveryResponse {
            gateway_org_id: org.to_string(),
            gateway_org_name: Some(format!("Org {org}")),
            gateway_url: Some(format!("https://{org}.example.org")),
            patient_match: true,
            external_patient: Some(ExternalPatient {
                id: Some(id.to_string()),
                system: Some(format!("{org}.1")),
            }),
            patient_demographics: None,
        }
    }

    struct FakeGateway {
        contacted: usize,
        responses: Vec<OutboundDiscoveryResponse>,
        sent: Mutex<Vec<OutboundDiscoveryRequest>>,
    }

    #[async_trait]
    impl CarequalityGateway for FakeGateway {
        async fn start_outbound_discovery(&self, request: &OutboundDiscoveryRequest) -> Result<usize> {
            self.sent.lock().unwrap().push(request.clone());
            Ok(self.contacted)
        }

        async fn get_outbound_discovery_results(
            &self,
            _: &RequestId,
        ) -> Result<Vec<OutboundDiscoveryResponse>> {
            Ok(self.responses.clone())
        }
    }

    /// Poller that fetches once
    struct OneShotPoller;

    #[async_trait]
    impl ResultPoller for OneShotPoller {
        async fn wait_for(
            &self,
            gateway: &dyn CarequalityGateway,
            request_id: &RequestId,
            _: usize,
        ) -> Result<Vec<OutboundDiscoveryResponse>> {
            gateway.get_outbound_discovery_results(request_id).await
        }
    }

    async fn started_patient(store: &InMemoryPatientStore, request: &DiscoveryRequest) -> PatientRecord {
        let patient =
            PatientRecord::new(CxId::new("cx").unwrap(), PatientId::new("pt").unwrap(), Utc::now());
        store.insert_patient(&patient).await.unwrap();
        let params = request.to_params(Utc::now());
        store
            .update_external_data(
                &patient.key(),
                Box::new(move |record| {
                    record
                        .external_data
                        .entry_mut(HieNetwork::Carequality)
                        .discovery_params = Some(params);
                    Ok(())
                }),
            )
            .await
            .unwrap()
    }

    fn request() -> DiscoveryRequest {
        DiscoveryRequest::new(RequestId::new("req-1").unwrap(), FacilityId::new("fac").unwrap())
    }

    #[tokio::test]
    async fn test_discover_persists_links_without_excluded_orgs() {
        let store = Arc::new(InMemoryPatientStore::new());
        let request = request().with_org_id_exclude_list(vec!["2.2".to_string()]);
        let patient = started_patient(&store, &request).await;

        let gateway = Arc::new(FakeGateway {
            contacted: 3,
            responses: vec![matched("1.1", "a"), matched("2.2", "b"), matched("3.3", "c")],
            sent: Mutex::new(Vec::new()),
        });
        let driver = CarequalityDriver::new(gateway.clone(), Arc::new(OneShotPoller), store.clone());

        driver.discover(&patient, &request).await.unwrap();

        let stored = store.get_patient(&patient.key()).await.unwrap();
        let links = &stored.network_state(HieNetwork::Carequality).unwrap().links;
        let ids: Vec<&str> = links.iter().map(|l| l.patient_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        let sent = gateway.sent.lock().unwrap();
        assert_eq!(sent[0].excluded_org_ids, vec!["2.2".to_string()]);
    }

    #[tokio::test]
    async fn test_no_gateways_means_no_links() {
        let store = Arc::new(InMemoryPatientStore::new());
        let request = request();
        let patient = started_patient(&store, &request).await;

        let gateway = Arc::new(FakeGateway {
            contacted: 0,
            responses: vec![matched("1.1", "a")],
            sent: Mutex::new(Vec::new()),
        });
        let driver = CarequalityDriver::new(gateway, Arc::new(OneShotPoller), store.clone());
        driver.discover(&patient, &request).await.unwrap();

        let stored = store.get_patient(&patient.key()).await.unwrap();
        assert!(stored.network_state(HieNetwork::Carequality).unwrap().links.is_empty());
    }
}
