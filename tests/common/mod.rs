//! Shared fakes for the discovery integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use hie_orchestrator::adapters::database::PatientRecordStore;
use hie_orchestrator::adapters::doc_query::DocQueryTrigger;
use hie_orchestrator::adapters::memory::InMemoryPatientStore;
use hie_orchestrator::core::discovery::{DiscoveryCoordinator, DiscoveryDriver};
use hie_orchestrator::domain::{
    CxId, DiscoveryParams, DiscoveryRequest, DiscoveryStatus, DocQueryProgressUpdate, FacilityId,
    GatewayError, HieNetwork, NetworkDiscoveryState, NetworkLink, PatientDemographics, PatientId,
    PatientKey, PatientRecord, RequestId, Result,
};
use hie_orchestrator::logging::RecordingSink;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Driver that records every request it receives
///
/// A gated driver holds each run open until the test adds a permit, which
/// keeps the network in `processing` for as long as the test needs. A
/// linking driver stores its links on the patient like the real drivers do.
pub struct FakeDriver {
    network: HieNetwork,
    fail: bool,
    gate: Option<Arc<Semaphore>>,
    links: Vec<NetworkLink>,
    store: Mutex<Option<Arc<InMemoryPatientStore>>>,
    calls: Mutex<Vec<DiscoveryRequest>>,
}

impl FakeDriver {
    fn build(network: HieNetwork, fail: bool, gate: Option<Arc<Semaphore>>) -> Arc<Self> {
        Self::build_with_links(network, fail, gate, Vec::new())
    }

    fn build_with_links(
        network: HieNetwork,
        fail: bool,
        gate: Option<Arc<Semaphore>>,
        links: Vec<NetworkLink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            network,
            fail,
            gate,
            links,
            store: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn linking(network: HieNetwork, links: Vec<NetworkLink>) -> Arc<Self> {
        Self::build_with_links(network, false, None, links)
    }

    fn attach(&self, store: Arc<InMemoryPatientStore>) {
        *self.store.lock().unwrap() = Some(store);
    }

    pub fn succeeding(network: HieNetwork) -> Arc<Self> {
        Self::build(network, false, None)
    }

    pub fn failing(network: HieNetwork) -> Arc<Self> {
        Self::build(network, true, None)
    }

    pub fn gated(network: HieNetwork, gate: Arc<Semaphore>) -> Arc<Self> {
        Self::build(network, false, Some(gate))
    }

    pub fn calls(&self) -> Vec<DiscoveryRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn request_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|r| r.request_id.into_inner())
            .collect()
    }
}

#[async_trait]
impl DiscoveryDriver for FakeDriver {
    fn network(&self) -> HieNetwork {
        self.network
    }

    async fn discover(&self, patient: &PatientRecord, request: &DiscoveryRequest) -> Result<()> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.fail {
            return Err(GatewayError::ServerError {
                status: 502,
                message: "gateway unavailable".to_string(),
            }
            .into());
        }

        let store = self.store.lock().unwrap().clone();
        if let (Some(store), false) = (store, self.links.is_empty()) {
            let links = self.links.clone();
            let network = self.network;
            store
                .update_external_data(
                    &patient.key(),
                    Box::new(move |record| {
                        record.external_data.entry_mut(network).links = links;
                        Ok(())
                    }),
                )
                .await?;
        }
        Ok(())
    }
}

/// Document query trigger that records calls
#[derive(Default)]
pub struct FakeDocQuery {
    pub started: Mutex<Vec<(HieNetwork, RequestId, bool)>>,
    pub progress: Mutex<Vec<(HieNetwork, RequestId, DocQueryProgressUpdate)>>,
}

impl FakeDocQuery {
    pub fn started(&self) -> Vec<(HieNetwork, RequestId, bool)> {
        self.started.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<(HieNetwork, RequestId, DocQueryProgressUpdate)> {
        self.progress.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocQueryTrigger for FakeDocQuery {
    async fn start_document_query(
        &self,
        _patient: &PatientRecord,
        network: HieNetwork,
        request_id: &RequestId,
        trigger_consolidated: bool,
    ) -> Result<()> {
        self.started
            .lock()
            .unwrap()
            .push((network, request_id.clone(), trigger_consolidated));
        Ok(())
    }

    async fn set_doc_query_progress(
        &self,
        _patient: &PatientRecord,
        request_id: &RequestId,
        network: HieNetwork,
        update: DocQueryProgressUpdate,
    ) -> Result<()> {
        self.progress
            .lock()
            .unwrap()
            .push((network, request_id.clone(), update));
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<InMemoryPatientStore>,
    pub cq: Arc<FakeDriver>,
    pub cw: Arc<FakeDriver>,
    pub doc_query: Arc<FakeDocQuery>,
    pub sink: Arc<RecordingSink>,
    pub coordinator: Arc<DiscoveryCoordinator>,
}

impl Harness {
    pub fn new(patients: Vec<PatientRecord>, cq: Arc<FakeDriver>, cw: Arc<FakeDriver>) -> Self {
        Self::with_enabled(patients, (cq, true), (cw, true))
    }

    pub fn with_enabled(
        patients: Vec<PatientRecord>,
        (cq, cq_enabled): (Arc<FakeDriver>, bool),
        (cw, cw_enabled): (Arc<FakeDriver>, bool),
    ) -> Self {
        let store = Arc::new(InMemoryPatientStore::with_patients(patients));
        cq.attach(store.clone());
        cw.attach(store.clone());
        let doc_query = Arc::new(FakeDocQuery::default());
        let sink = Arc::new(RecordingSink::new());
        let coordinator =
            DiscoveryCoordinator::builder(store.clone(), doc_query.clone(), sink.clone())
                .driver(cq.clone(), cq_enabled)
                .driver(cw.clone(), cw_enabled)
                .build();
        Self {
            store,
            cq,
            cw,
            doc_query,
            sink,
            coordinator,
        }
    }

    pub async fn patient(&self) -> PatientRecord {
        self.store.get_patient(&key()).await.unwrap()
    }

    pub async fn state(&self, network: HieNetwork) -> NetworkDiscoveryState {
        self.patient()
            .await
            .network_state(network)
            .cloned()
            .unwrap_or_default()
    }
}

pub fn key() -> PatientKey {
    PatientKey::new(CxId::new("cx-1").unwrap(), PatientId::new("pt-1").unwrap())
}

pub fn patient() -> PatientRecord {
    PatientRecord::new(
        CxId::new("cx-1").unwrap(),
        PatientId::new("pt-1").unwrap(),
        Utc::now(),
    )
    .with_facility(FacilityId::new("fac-1").unwrap())
}

pub fn request(request_id: &str, facility_id: &str) -> DiscoveryRequest {
    DiscoveryRequest::new(
        RequestId::new(request_id).unwrap(),
        FacilityId::new(facility_id).unwrap(),
    )
}

/// Network state of a run that is still in flight
pub fn processing(request_id: &str) -> NetworkDiscoveryState {
    NetworkDiscoveryState {
        discovery_status: Some(DiscoveryStatus::Processing),
        discovery_params: Some(DiscoveryParams {
            request_id: RequestId::new(request_id).unwrap(),
            facility_id: FacilityId::new("fac-1").unwrap(),
            started_at: Utc::now(),
            rerun_pd_on_new_demographics: false,
        }),
        ..Default::default()
    }
}

/// Network state of a settled run
pub fn settled(request_id: &str, status: DiscoveryStatus) -> NetworkDiscoveryState {
    NetworkDiscoveryState {
        discovery_status: Some(status),
        ..processing(request_id)
    }
}

pub fn patient_with(network: HieNetwork, state: NetworkDiscoveryState) -> PatientRecord {
    let mut patient = patient();
    *patient.external_data.entry_mut(network) = state;
    patient
}

pub fn demographics(first_name: &str, last_name: &str) -> PatientDemographics {
    PatientDemographics {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        ..Default::default()
    }
}

/// A matched remote patient carrying the remote demographics
pub fn link(remote_id: &str, demographics: PatientDemographics) -> NetworkLink {
    NetworkLink {
        patient_id: remote_id.to_string(),
        system_id: "2.16.840.1.113883.3.1".to_string(),
        url: "https://gateway.example.org/xcpd".to_string(),
        org_id: Some("2.16.840.1.113883.3".to_string()),
        org_name: None,
        demographics: Some(demographics),
    }
}
