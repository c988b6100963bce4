//! PostgreSQL patient record store
//!
//! Patients live in a single `patients` table keyed by `(cx_id, id)` with the
//! per-network discovery state in a JSONB `external_data` column.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLPatientStore;
pub use client::PostgreSQLClient;
pub use models::PatientRow;
