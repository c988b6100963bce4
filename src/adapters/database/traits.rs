//! Patient record store abstraction
//!
//! All reads and writes of per-network discovery state go through
//! [`PatientRecordStore`]. Writes use a locked read-modify-write: the store
//! locks the patient row, re-reads the live record, hands it to a mutator
//! and persists only the external data.

use crate::domain::ids::{CxId, PatientKey};
use crate::domain::patient::PatientRecord;
use crate::domain::Result;
use async_trait::async_trait;

/// Closure applied to the freshly locked patient record
///
/// Returning an error aborts the transaction and leaves the record untouched.
pub type PatientMutator<'a> = Box<dyn FnOnce(&mut PatientRecord) -> Result<()> + Send + 'a>;

/// Transactional store of patient records keyed by `(cx_id, patient_id)`
#[async_trait]
pub trait PatientRecordStore: Send + Sync {
    /// Load a patient record without taking a lock
    ///
    /// # Errors
    ///
    /// Returns `HieError::PatientNotFound` if the record does not exist.
    async fn get_patient(&self, key: &PatientKey) -> Result<PatientRecord>;

    /// Lock the patient row, re-read it, apply `mutator` and persist the
    /// resulting external data
    ///
    /// # Arguments
    ///
    /// * `key` - Patient to update
    /// * `mutator` - Change applied to the live record inside the transaction
    ///
    /// # Returns
    ///
    /// The record as committed.
    ///
    /// # Errors
    ///
    /// Returns `HieError::PatientNotFound` if the record does not exist, or the
    /// mutator's own error (the transaction is rolled back).
    async fn update_external_data<'a>(
        &self,
        key: &PatientKey,
        mutator: PatientMutator<'a>,
    ) -> Result<PatientRecord>;

    /// Insert a new patient record
    ///
    /// # Errors
    ///
    /// Returns `HieError::Validation` if the patient already exists.
    async fn insert_patient(&self, patient: &PatientRecord) -> Result<()>;

    /// List patients, optionally restricted to one customer
    async fn list_patients(&self, cx_id: Option<&CxId>) -> Result<Vec<PatientRecord>>;

    /// Check that the backend is reachable
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    /// Human-readable backend name for logs and CLI output
    fn backend_name(&self) -> &'static str;
}
