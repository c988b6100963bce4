//! Patient record store abstraction
//!
//! A trait-based abstraction lets the orchestration core run against
//! PostgreSQL in production and an in-memory store in tests.

pub mod factory;
pub mod traits;

pub use factory::create_patient_store;
pub use traits::{PatientMutator, PatientRecordStore};
