//! PostgreSQL implementation of [`PatientRecordStore`]
//!
//! Every external data write runs in its own transaction:
//! `SELECT ... FOR UPDATE` locks the row, the mutator runs against the row
//! as read under the lock, and only the `external_data` column is written back.

use crate::adapters::database::traits::{PatientMutator, PatientRecordStore};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{PatientRow, PATIENT_COLUMNS};
use crate::domain::ids::{CxId, PatientKey};
use crate::domain::patient::PatientRecord;
use crate::domain::{HieError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Patient record store backed by the `patients` table
pub struct PostgreSQLPatientStore {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLPatientStore {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

fn not_found(key: &PatientKey) -> HieError {
    HieError::PatientNotFound {
        cx_id: key.cx_id.to_string(),
        patient_id: key.patient_id.to_string(),
    }
}

fn db_error(action: &str, e: tokio_postgres::Error) -> HieError {
    HieError::Database(format!("{action}: {e}"))
}

#[async_trait]
impl PatientRecordStore for PostgreSQLPatientStore {
    async fn get_patient(&self, key: &PatientKey) -> Result<PatientRecord> {
        let query = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE cx_id = $1 AND id = $2");
        let rows = self
            .client
            .query(&query, &[&key.cx_id.as_str(), &key.patient_id.as_str()])
            .await?;

        let row = rows.first().ok_or_else(|| not_found(key))?;
        PatientRow::from_row(row)?.to_domain()
    }

    async fn update_external_data<'a>(
        &self,
        key: &PatientKey,
        mutator: PatientMutator<'a>,
    ) -> Result<PatientRecord> {
        let mut conn = self.client.get_connection().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        tx.batch_execute(&self.client.statement_timeout_sql())
            .await
            .map_err(|e| db_error("Failed to set statement timeout", e))?;

        let select = format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE cx_id = $1 AND id = $2 FOR UPDATE"
        );
        let row = tx
            .query_opt(&select, &[&key.cx_id.as_str(), &key.patient_id.as_str()])
            .await
            .map_err(|e| db_error("Failed to lock patient row", e))?
            .ok_or_else(|| not_found(key))?;

        let mut patient = PatientRow::from_row(&row)?.to_domain()?;

        // Dropping the transaction on error rolls it back
        mutator(&mut patient)?;

        let external_data = serde_json::to_value(&patient.external_data)?;
        tx.execute(
            "UPDATE patients SET external_data = $3, updated_at = now() WHERE cx_id = $1 AND id = $2",
            &[&key.cx_id.as_str(), &key.patient_id.as_str(), &external_data],
        )
        .await
        .map_err(|e| db_error("Failed to update external data", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;

        tracing::debug!(
            cx_id = %key.cx_id,
            patient_id = %key.patient_id,
            "External data updated"
        );

        Ok(patient)
    }

    async fn insert_patient(&self, patient: &PatientRecord) -> Result<()> {
        let row = PatientRow::from_domain(patient)?;

        let inserted = self
            .client
            .execute(
                r#"
                INSERT INTO patients (cx_id, id, facility_ids, demographics, external_data, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (cx_id, id) DO NOTHING
                "#,
                &[
                    &row.cx_id,
                    &row.id,
                    &row.facility_ids,
                    &row.demographics,
                    &row.external_data,
                    &row.created_at,
                ],
            )
            .await?;

        if inserted == 0 {
            return Err(HieError::Validation(format!(
                "Patient already exists: {}",
                patient.key()
            )));
        }

        tracing::info!(
            cx_id = %patient.cx_id,
            patient_id = %patient.patient_id,
            "Patient inserted"
        );
        Ok(())
    }

    async fn list_patients(&self, cx_id: Option<&CxId>) -> Result<Vec<PatientRecord>> {
        let rows = match cx_id {
            Some(cx_id) => {
                let query = format!(
                    "SELECT {PATIENT_COLUMNS} FROM patients WHERE cx_id = $1 ORDER BY created_at"
                );
                self.client.query(&query, &[&cx_id.as_str()]).await?
            }
            None => {
                let query =
                    format!("SELECT {PATIENT_COLUMNS} FROM patients ORDER BY cx_id, created_at");
                self.client.query(&query, &[]).await?
            }
        };

        rows.iter()
            .map(|row| PatientRow::from_row(row)?.to_domain())
            .collect()
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    fn backend_name(&self) -> &'static str {
        "postgresql"
    }
}
