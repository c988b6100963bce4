//! Carequality outbound patient discovery gateway
//!
//! Discovery is asynchronous on the gateway side: one call fans the request
//! out to every eligible IHE gateway and returns how many were contacted;
//! responses are then fetched by request ID until enough have arrived.

use super::http::{build_http_client, join_url, read_json, send, with_api_key};
use crate::config::{CarequalityConfig, SecretString};
use crate::domain::ids::{CxId, FacilityId, PatientId, RequestId};
use crate::domain::patient::{NetworkLink, PatientDemographics};
use crate::domain::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Fan-out request sent to the outbound gateway service
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundDiscoveryRequest {
    pub request_id: RequestId,
    pub cx_id: CxId,
    pub patient_id: PatientId,
    pub facility_id: FacilityId,
    pub demographics: PatientDemographics,
    /// Gateways (organization OIDs) that must not be contacted
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub excluded_org_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartDiscoveryResponse {
    num_gateways_contacted: usize,
}

/// Patient identifier returned by a gateway on a match
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExternalPatient {
    pub id: Option<String>,
    pub system: Option<String>,
}

/// One gateway's answer to a discovery request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundDiscoveryResponse {
    pub gateway_org_id: String,
    #[serde(default)]
    pub gateway_org_name: Option<String>,
    #[serde(default)]
    pub gateway_url: Option<String>,
    #[serde(default)]
    pub patient_match: bool,
    #[serde(default)]
    pub external_patient: Option<ExternalPatient>,
    /// Demographics of the matched patient as held by the gateway
    #[serde(default)]
    pub patient_demographics: Option<PatientDemographics>,
}

impl OutboundDiscoveryResponse {
    /// Link for a matched patient; requires an id, a system and a URL
    pub fn to_link(&self) -> Option<NetworkLink> {
        if !self.patient_match {
            return None;
        }
        let patient = self.external_patient.as_ref()?;
        Some(NetworkLink {
            patient_id: patient.id.clone()?,
            system_id: patient.system.clone()?,
            url: self.gateway_url.clone()?,
            org_id: Some(self.gateway_org_id.clone()),
            org_name: self.gateway_org_name.clone(),
            demographics: self.patient_demographics.clone(),
        })
    }
}

/// Outbound Carequality gateway service
#[async_trait]
pub trait CarequalityGateway: Send + Sync {
    /// Start discovery; returns the number of gateways contacted
    async fn start_outbound_discovery(&self, request: &OutboundDiscoveryRequest) -> Result<usize>;

    /// Responses received so far for a request
    async fn get_outbound_discovery_results(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<OutboundDiscoveryResponse>>;
}

/// HTTP implementation of [`CarequalityGateway`]
pub struct HttpCarequalityGateway {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl HttpCarequalityGateway {
    pub fn new(config: &CarequalityConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config.timeout_seconds)?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl CarequalityGateway for HttpCarequalityGateway {
    async fn start_outbound_discovery(&self, request: &OutboundDiscoveryRequest) -> Result<usize> {
        let url = join_url(&self.base_url, "/patient-discovery");
        tracing::debug!(
            request_id = %request.request_id,
            patient_id = %request.patient_id,
            "Starting outbound patient discovery"
        );

        let builder = with_api_key(self.client.post(&url), self.api_key.as_ref()).json(request);
        let response = send(builder, &url).await?;
        let body: StartDiscoveryResponse = read_json(response, &url).await?;
        Ok(body.num_gateways_contacted)
    }

    async fn get_outbound_discovery_results(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<OutboundDiscoveryResponse>> {
        let url = join_url(
            &self.base_url,
            &format!("/patient-discovery/{}/results", request_id),
        );
        let builder = with_api_key(self.client.get(&url), self.api_key.as_ref());
        let response = send(builder, &url).await?;
        Ok(read_json(response, &url).await?)
    }
}
