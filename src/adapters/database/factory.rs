//! Patient store factory

use crate::adapters::database::traits::PatientRecordStore;
use crate::adapters::memory::InMemoryPatientStore;
use crate::adapters::postgresql::{PostgreSQLClient, PostgreSQLPatientStore};
use crate::config::schema::{DatabaseTarget, HieConfig};
use crate::domain::{HieError, Result};
use std::sync::Arc;

/// Create the patient record store selected by `database_target`
///
/// # Errors
///
/// Returns an error if the PostgreSQL section is missing or the pool cannot
/// be created.
pub async fn create_patient_store(config: &HieConfig) -> Result<Arc<dyn PatientRecordStore>> {
    match config.database_target {
        DatabaseTarget::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                HieError::Configuration(
                    "postgresql configuration is required when database_target = 'postgresql'"
                        .to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL patient store");
            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            Ok(Arc::new(PostgreSQLPatientStore::new(client)))
        }
        DatabaseTarget::Memory => {
            tracing::warn!("Using in-memory patient store; state is lost on exit");
            Ok(Arc::new(InMemoryPatientStore::new()))
        }
    }
}
