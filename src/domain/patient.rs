//! Patient record and per-network discovery state
//!
//! A [`PatientRecord`] owns an [`ExternalData`] map with one
//! [`NetworkDiscoveryState`] per [`HieNetwork`]. The record is only ever
//! mutated through the store's locked read-modify-write primitive.

use super::ids::{CxId, FacilityId, PatientId, PatientKey, RequestId};
use super::network::HieNetwork;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Discovery status of one network
///
/// An absent status (`Option::None` on [`NetworkDiscoveryState`]) means
/// discovery never ran for that network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStatus {
    Processing,
    Completed,
    Failed,
}

impl DiscoveryStatus {
    /// Completed and failed both end a discovery run
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DiscoveryStatus::Processing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryStatus::Processing => "processing",
            DiscoveryStatus::Completed => "completed",
            DiscoveryStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DiscoveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DiscoveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "processing" => Ok(DiscoveryStatus::Processing),
            "completed" => Ok(DiscoveryStatus::Completed),
            "failed" => Ok(DiscoveryStatus::Failed),
            other => Err(format!(
                "Invalid discovery status '{other}'. Expected processing, completed or failed"
            )),
        }
    }
}

/// Parameters of the in-flight or most recent discovery run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryParams {
    pub request_id: RequestId,
    pub facility_id: FacilityId,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub rerun_pd_on_new_demographics: bool,
}

/// A discovery request, either run immediately or stored as the single
/// pending schedule of a network
///
/// # Examples
///
/// ```
/// use hie_orchestrator::domain::{DiscoveryRequest, FacilityId, RequestId};
///
/// let request = DiscoveryRequest::new(
///     RequestId::new("req-1").unwrap(),
///     FacilityId::new("fac-1").unwrap(),
/// )
/// .with_rerun_pd_on_new_demographics(true)
/// .with_org_id_exclude_list(vec!["2.16.840.1.113883.3.9621".to_string()]);
///
/// assert!(request.rerun_pd_on_new_demographics);
/// assert!(request.is_org_excluded("2.16.840.1.113883.3.9621"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryRequest {
    pub request_id: RequestId,
    pub facility_id: FacilityId,
    #[serde(default)]
    pub rerun_pd_on_new_demographics: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id_exclude_list: Option<Vec<String>>,
    /// Run against the network even when it is disabled for the customer
    #[serde(default)]
    pub force_enabled: bool,
}

/// The pending "run after the current discovery settles" request
pub type ScheduledDiscoveryRequest = DiscoveryRequest;

impl DiscoveryRequest {
    pub fn new(request_id: RequestId, facility_id: FacilityId) -> Self {
        Self {
            request_id,
            facility_id,
            rerun_pd_on_new_demographics: false,
            org_id_exclude_list: None,
            force_enabled: false,
        }
    }

    pub fn with_rerun_pd_on_new_demographics(mut self, rerun: bool) -> Self {
        self.rerun_pd_on_new_demographics = rerun;
        self
    }

    pub fn with_org_id_exclude_list(mut self, org_ids: Vec<String>) -> Self {
        self.org_id_exclude_list = Some(org_ids);
        self
    }

    pub fn with_force_enabled(mut self, force: bool) -> Self {
        self.force_enabled = force;
        self
    }

    /// Discovery params recorded when this request starts running
    pub fn to_params(&self, started_at: DateTime<Utc>) -> DiscoveryParams {
        DiscoveryParams {
            request_id: self.request_id.clone(),
            facility_id: self.facility_id.clone(),
            started_at,
            rerun_pd_on_new_demographics: self.rerun_pd_on_new_demographics,
        }
    }

    pub fn is_org_excluded(&self, org_id: &str) -> bool {
        self.org_id_exclude_list
            .as_ref()
            .is_some_and(|list| list.iter().any(|excluded| excluded == org_id))
    }
}

/// A remote patient matched by a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkLink {
    /// Patient identifier assigned by the remote organization
    pub patient_id: String,
    /// Assigning authority (OID)
    pub system_id: String,
    /// Endpoint the remote record is reachable at
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_name: Option<String>,
    /// Demographics the remote organization holds for the matched patient
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demographics: Option<PatientDemographics>,
}

/// Discovery state of one network on one patient
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDiscoveryState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_status: Option<DiscoveryStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_params: Option<DiscoveryParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_pd_request: Option<ScheduledDiscoveryRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_doc_query_request_id: Option<RequestId>,
    #[serde(default)]
    pub scheduled_doc_query_trigger_consolidated: bool,
    /// Identifier the network assigned to this patient (CommonWell)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_patient_id: Option<String>,
    #[serde(default)]
    pub links: Vec<NetworkLink>,
    /// Link demographics that already triggered a re-run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links_demographics: Vec<PatientDemographics>,
}

impl NetworkDiscoveryState {
    pub fn is_processing(&self) -> bool {
        self.discovery_status == Some(DiscoveryStatus::Processing)
    }

    pub fn has_no_status(&self) -> bool {
        self.discovery_status.is_none()
    }

    /// Start time of the most recent discovery run
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.discovery_params.as_ref().map(|p| p.started_at)
    }
}

/// Per-network external data of a patient, keyed by the fixed network set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalData(BTreeMap<HieNetwork, NetworkDiscoveryState>);

impl ExternalData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state of a network, if it has ever been written
    pub fn get(&self, network: HieNetwork) -> Option<&NetworkDiscoveryState> {
        self.0.get(&network)
    }

    /// Returns the state of a network, creating an empty one if absent
    pub fn entry_mut(&mut self, network: HieNetwork) -> &mut NetworkDiscoveryState {
        self.0.entry(network).or_default()
    }

    pub fn status(&self, network: HieNetwork) -> Option<DiscoveryStatus> {
        self.get(network).and_then(|s| s.discovery_status)
    }

    pub fn scheduled_pd_request(&self, network: HieNetwork) -> Option<&ScheduledDiscoveryRequest> {
        self.get(network).and_then(|s| s.scheduled_pd_request.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HieNetwork, &NetworkDiscoveryState)> {
        self.0.iter()
    }

    /// Demographics of `network`'s links not yet known on any network
    ///
    /// Known means equal to `own` or already recorded as link demographics
    /// of any network. Each new value is returned once.
    pub fn new_link_demographics(
        &self,
        network: HieNetwork,
        own: &PatientDemographics,
    ) -> Vec<PatientDemographics> {
        let mut known: Vec<PatientDemographics> = self
            .0
            .values()
            .flat_map(|s| s.links_demographics.iter().map(PatientDemographics::normalized))
            .collect();
        known.push(own.normalized());

        let mut found = Vec::new();
        let links = self.get(network).map(|s| s.links.as_slice()).unwrap_or_default();
        for demographics in links.iter().filter_map(|l| l.demographics.as_ref()) {
            let normalized = demographics.normalized();
            if !known.contains(&normalized) {
                known.push(normalized);
                found.push(demographics.clone());
            }
        }
        found
    }
}

/// Demographics sent to the networks for matching
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDemographics {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender_at_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
}

impl PatientDemographics {
    /// Case and whitespace insensitive form used for comparison
    pub fn normalized(&self) -> Self {
        fn clean(value: &str) -> String {
            value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
        }
        Self {
            first_name: clean(&self.first_name),
            last_name: clean(&self.last_name),
            dob: self.dob,
            gender_at_birth: self.gender_at_birth.as_deref().map(clean),
            zip: self
                .zip
                .as_deref()
                .map(|z| z.trim().chars().take(5).collect()),
        }
    }
}

/// Patient record identified by `(cx_id, patient_id)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    pub cx_id: CxId,
    pub patient_id: PatientId,
    #[serde(default)]
    pub facility_ids: Vec<FacilityId>,
    #[serde(default)]
    pub demographics: PatientDemographics,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub external_data: ExternalData,
}

impl PatientRecord {
    pub fn new(cx_id: CxId, patient_id: PatientId, created_at: DateTime<Utc>) -> Self {
        Self {
            cx_id,
            patient_id,
            facility_ids: Vec::new(),
            demographics: PatientDemographics::default(),
            created_at,
            external_data: ExternalData::new(),
        }
    }

    pub fn with_facility(mut self, facility_id: FacilityId) -> Self {
        self.facility_ids.push(facility_id);
        self
    }

    pub fn with_demographics(mut self, demographics: PatientDemographics) -> Self {
        self.demographics = demographics;
        self
    }

    pub fn key(&self) -> PatientKey {
        PatientKey::new(self.cx_id.clone(), self.patient_id.clone())
    }

    pub fn network_state(&self, network: HieNetwork) -> Option<&NetworkDiscoveryState> {
        self.external_data.get(network)
    }
}
