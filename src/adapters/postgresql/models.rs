//! Row model for the `patients` table

use crate::domain::ids::{CxId, FacilityId, PatientId};
use crate::domain::patient::{ExternalData, PatientDemographics, PatientRecord};
use crate::domain::{HieError, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio_postgres::Row;

/// Columns selected by every patient query
pub const PATIENT_COLUMNS: &str = "cx_id, id, facility_ids, demographics, external_data, created_at";

/// One row of the `patients` table
#[derive(Debug, Clone)]
pub struct PatientRow {
    pub cx_id: String,
    pub id: String,
    pub facility_ids: Vec<String>,
    pub demographics: Value,
    pub external_data: Value,
    pub created_at: DateTime<Utc>,
}

fn column_error(column: &str, e: tokio_postgres::Error) -> HieError {
    HieError::Database(format!("Failed to read column '{column}': {e}"))
}

impl PatientRow {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            cx_id: row.try_get("cx_id").map_err(|e| column_error("cx_id", e))?,
            id: row.try_get("id").map_err(|e| column_error("id", e))?,
            facility_ids: row
                .try_get("facility_ids")
                .map_err(|e| column_error("facility_ids", e))?,
            demographics: row
                .try_get("demographics")
                .map_err(|e| column_error("demographics", e))?,
            external_data: row
                .try_get("external_data")
                .map_err(|e| column_error("external_data", e))?,
            created_at: row
                .try_get("created_at")
                .map_err(|e| column_error("created_at", e))?,
        })
    }

    pub fn from_domain(patient: &PatientRecord) -> Result<Self> {
        Ok(Self {
            cx_id: patient.cx_id.to_string(),
            id: patient.patient_id.to_string(),
            facility_ids: patient.facility_ids.iter().map(|f| f.to_string()).collect(),
            demographics: serde_json::to_value(&patient.demographics)?,
            external_data: serde_json::to_value(&patient.external_data)?,
            created_at: patient.created_at,
        })
    }

    pub fn to_domain(self) -> Result<PatientRecord> {
        let cx_id = CxId::new(self.cx_id).map_err(HieError::Validation)?;
        let patient_id = PatientId::new(self.id).map_err(HieError::Validation)?;
        let facility_ids = self
            .facility_ids
            .into_iter()
            .map(FacilityId::new)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(HieError::Validation)?;

        let demographics: PatientDemographics = if self.demographics.is_null() {
            PatientDemographics::default()
        } else {
            serde_json::from_value(self.demographics)?
        };
        let external_data: ExternalData = if self.external_data.is_null() {
            ExternalData::default()
        } else {
            serde_json::from_value(self.external_data)?
        };

        Ok(PatientRecord {
            cx_id,
            patient_id,
            facility_ids,
            demographics,
            created_at: self.created_at,
            external_data,
        })
    }
}
