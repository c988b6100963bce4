//! CommonWell patient registration and link retrieval

use super::http::{build_http_client, join_url, read_json, send, with_api_key};
use crate::config::{CommonWellConfig, SecretString};
use crate::domain::ids::{CxId, FacilityId, PatientId};
use crate::domain::patient::{NetworkLink, PatientDemographics, PatientRecord};
use crate::domain::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterPatientRequest<'a> {
    cx_id: &'a CxId,
    patient_id: &'a PatientId,
    facility_id: &'a FacilityId,
    demographics: &'a PatientDemographics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterPatientResponse {
    patient_id: String,
}

/// Link between the CommonWell patient and a remote organization's patient
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonWellLink {
    pub patient_id: String,
    pub assigning_authority: String,
    pub url: String,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub org_name: Option<String>,
    #[serde(default)]
    pub demographics: Option<PatientDemographics>,
}

impl From<CommonWellLink> for NetworkLink {
    fn from(link: CommonWellLink) -> Self {
        NetworkLink {
            patient_id: link.patient_id,
            system_id: link.assigning_authority,
            url: link.url,
            org_id: link.org_id,
            org_name: link.org_name,
            demographics: link.demographics,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LinksResponse {
    #[serde(default)]
    links: Vec<CommonWellLink>,
}

/// CommonWell integration service
#[async_trait]
pub trait CommonWellClient: Send + Sync {
    /// Create or update the patient in CommonWell; returns the CommonWell patient ID
    async fn register_patient(
        &self,
        patient: &PatientRecord,
        facility_id: &FacilityId,
    ) -> Result<String>;

    /// Links CommonWell currently holds for the patient
    async fn get_patient_links(&self, network_patient_id: &str) -> Result<Vec<CommonWellLink>>;
}

/// HTTP implementation of [`CommonWellClient`]
pub struct HttpCommonWellClient {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl HttpCommonWellClient {
    pub fn new(config: &CommonWellConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config.timeout_seconds)?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl CommonWellClient for HttpCommonWellClient {
    async fn register_patient(
        &self,
        patient: &PatientRecord,
        facility_id: &FacilityId,
    ) -> Result<String> {
        let url = join_url(&self.base_url, "/patients");
        let body = RegisterPatientRequest {
            cx_id: &patient.cx_id,
            patient_id: &patient.patient_id,
            facility_id,
            demographics: &patient.demographics,
        };

        let builder = with_api_key(self.client.post(&url), self.api_key.as_ref()).json(&body);
        let response = send(builder, &url).await?;
        let registered: RegisterPatientResponse = read_json(response, &url).await?;

        tracing::debug!(
            cx_id = %patient.cx_id,
            patient_id = %patient.patient_id,
            network_patient_id = %registered.patient_id,
            "Patient registered with CommonWell"
        );
        Ok(registered.patient_id)
    }

    async fn get_patient_links(&self, network_patient_id: &str) -> Result<Vec<CommonWellLink>> {
        let url = join_url(
            &self.base_url,
            &format!("/patients/{}/links", network_patient_id),
        );
        let builder = with_api_key(self.client.get(&url), self.api_key.as_ref());
        let response = send(builder, &url).await?;
        let body: LinksResponse = read_json(response, &url).await?;
        Ok(body.links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::domain::{GatewayError, HieError};
    use chrono::Utc;

    fn client(base_url: String) -> HttpCommonWellClient {
        HttpCommonWellClient::new(&CommonWellConfig {
            enabled: true,
            base_url,
            api_key: None,
            timeout_seconds: 5,
            retry: RetryConfig::default(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_register_patient() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/patients")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"cxId":"cx","patientId":"pt","facilityId":"fac"}"#.to_string(),
            ))
            .with_status(201)
            .with_body(r#"{"patientId": "cw-123"}"#)
            .create_async()
            .await;

        let patient =
            PatientRecord::new(CxId::new("cx").unwrap(), PatientId::new("pt").unwrap(), Utc::now());
        let id = client(server.url())
            .register_patient(&patient, &FacilityId::new("fac").unwrap())
            .await
            .unwrap();

        assert_eq!(id, "cw-123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_patient_links() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/patients/cw-123/links")
            .with_status(200)
            .with_body(
                r#"{"links": [{"patientId": "r1", "assigningAuthority": "2.16.1", "url": "https://org", "orgId": "2.16"}]}"#,
            )
            .create_async()
            .await;

        let links = client(server.url()).get_patient_links("cw-123").await.unwrap();
        assert_eq!(links.len(), 1);

        let link: NetworkLink = links[0].clone().into();
        assert_eq!(link.system_id, "2.16.1");
        assert_eq!(link.org_id.as_deref(), Some("2.16"));
    }

    #[tokio::test]
    async fn test_invalid_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/patients/cw-123/links")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = client(server.url())
            .get_patient_links("cw-123")
            .await
            .unwrap_err();
        assert!(matches!(err, HieError::Gateway(GatewayError::InvalidResponse(_))));
    }
}
