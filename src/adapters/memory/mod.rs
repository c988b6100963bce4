//! In-process patient record store
//!
//! Backs the `memory` database target and the test suites. A single mutex
//! over the whole map stands in for the row lock.

use crate::adapters::database::traits::{PatientMutator, PatientRecordStore};
use crate::domain::ids::{CxId, PatientKey};
use crate::domain::patient::PatientRecord;
use crate::domain::{HieError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// Patient store held in memory
#[derive(Debug, Default)]
pub struct InMemoryPatientStore {
    records: Mutex<BTreeMap<PatientKey, PatientRecord>>,
}

impl InMemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records
    pub fn with_patients(patients: impl IntoIterator<Item = PatientRecord>) -> Self {
        let records = patients.into_iter().map(|p| (p.key(), p)).collect();
        Self {
            records: Mutex::new(records),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

fn not_found(key: &PatientKey) -> HieError {
    HieError::PatientNotFound {
        cx_id: key.cx_id.to_string(),
        patient_id: key.patient_id.to_string(),
    }
}

#[async_trait]
impl PatientRecordStore for InMemoryPatientStore {
    async fn get_patient(&self, key: &PatientKey) -> Result<PatientRecord> {
        self.records
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| not_found(key))
    }

    async fn update_external_data<'a>(
        &self,
        key: &PatientKey,
        mutator: PatientMutator<'a>,
    ) -> Result<PatientRecord> {
        let mut records = self.records.lock().await;
        let stored = records.get_mut(key).ok_or_else(|| not_found(key))?;

        // Work on a copy so a failing mutator leaves the record untouched
        let mut working = stored.clone();
        mutator(&mut working)?;
        stored.external_data = working.external_data;

        Ok(stored.clone())
    }

    async fn insert_patient(&self, patient: &PatientRecord) -> Result<()> {
        let mut records = self.records.lock().await;
        let key = patient.key();
        if records.contains_key(&key) {
            return Err(HieError::Validation(format!("Patient already exists: {key}")));
        }
        records.insert(key, patient.clone());
        Ok(())
    }

    async fn list_patients(&self, cx_id: Option<&CxId>) -> Result<Vec<PatientRecord>> {
        let records = self.records.lock().await;
        Ok(records
            .values()
            .filter(|p| cx_id.map_or(true, |cx| &p.cx_id == cx))
            .cloned()
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
