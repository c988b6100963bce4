//! Document query pipeline trigger
//!
//! The pipeline itself lives in the internal API. Discovery only needs to
//! start a deferred query once links are known, or mark it failed when the
//! discovery it waited on failed.

use crate::adapters::hie::http::{build_http_client, join_url, send};
use crate::config::DocQueryConfig;
use crate::domain::{
    DocQueryProgressUpdate, GatewayError, HieError, HieNetwork, PatientRecord, RequestId, Result,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

/// Collaborator that starts document queries and reports their progress
#[async_trait]
pub trait DocQueryTrigger: Send + Sync {
    /// Start a document query for the patient
    async fn start_document_query(
        &self,
        patient: &PatientRecord,
        network: HieNetwork,
        request_id: &RequestId,
        trigger_consolidated: bool,
    ) -> Result<()>;

    /// Overwrite the download and convert progress of a document query
    async fn set_doc_query_progress(
        &self,
        patient: &PatientRecord,
        request_id: &RequestId,
        network: HieNetwork,
        update: DocQueryProgressUpdate,
    ) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartQueryBody<'a> {
    cx_id: &'a str,
    patient_id: &'a str,
    request_id: &'a str,
    source: HieNetwork,
    trigger_consolidated: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressBody<'a> {
    cx_id: &'a str,
    patient_id: &'a str,
    request_id: &'a str,
    source: HieNetwork,
    #[serde(flatten)]
    update: DocQueryProgressUpdate,
}

/// [`DocQueryTrigger`] over the internal HTTP API
pub struct HttpDocQueryTrigger {
    client: Client,
    base_url: String,
}

impl HttpDocQueryTrigger {
    pub fn new(config: &DocQueryConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config.timeout_seconds)?,
            base_url: config.base_url.clone(),
        })
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<()> {
        let url = join_url(&self.base_url, path);
        send(self.client.post(&url).json(body), &url)
            .await
            .map_err(doc_query_error)?;
        Ok(())
    }
}

fn doc_query_error(error: GatewayError) -> HieError {
    HieError::DocQuery(error.to_string())
}

#[async_trait]
impl DocQueryTrigger for HttpDocQueryTrigger {
    async fn start_document_query(
        &self,
        patient: &PatientRecord,
        network: HieNetwork,
        request_id: &RequestId,
        trigger_consolidated: bool,
    ) -> Result<()> {
        let body = StartQueryBody {
            cx_id: patient.cx_id.as_str(),
            patient_id: patient.patient_id.as_str(),
            request_id: request_id.as_str(),
            source: network,
            trigger_consolidated,
        };
        self.post("/internal/docs/query", &body).await?;

        tracing::info!(
            cx_id = %patient.cx_id,
            patient_id = %patient.patient_id,
            network = %network,
            request_id = %request_id,
            "Document query started"
        );
        Ok(())
    }

    async fn set_doc_query_progress(
        &self,
        patient: &PatientRecord,
        request_id: &RequestId,
        network: HieNetwork,
        update: DocQueryProgressUpdate,
    ) -> Result<()> {
        let body = ProgressBody {
            cx_id: patient.cx_id.as_str(),
            patient_id: patient.patient_id.as_str(),
            request_id: request_id.as_str(),
            source: network,
            update,
        };
        self.post("/internal/docs/query/progress", &body).await
    }
}
