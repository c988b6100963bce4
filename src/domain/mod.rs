//! Domain models and types for the orchestrator.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`CxId`], [`PatientId`], [`FacilityId`], [`RequestId`])
//! - **Networks** ([`HieNetwork`])
//! - **Patient state** ([`PatientRecord`], [`ExternalData`], [`NetworkDiscoveryState`])
//! - **Error types** ([`HieError`], [`GatewayError`])
//! - **Result type alias** ([`Result`])
//!
//! # Example
//!
//! ```rust
//! use hie_orchestrator::domain::{CxId, HieNetwork, PatientId, PatientRecord};
//! use chrono::Utc;
//!
//! let patient = PatientRecord::new(
//!     CxId::new("cx-1").unwrap(),
//!     PatientId::new("pt-1").unwrap(),
//!     Utc::now(),
//! );
//! assert!(patient.network_state(HieNetwork::Carequality).is_none());
//! ```

pub mod doc_query;
pub mod errors;
pub mod ids;
pub mod network;
pub mod patient;
pub mod result;

pub use doc_query::{DocQueryProgress, DocQueryProgressUpdate, ProgressStatus};
pub use errors::{GatewayError, HieError};
pub use ids::{
    CxId, FacilityId, PatientId, PatientKey, RequestId, RequestIdGenerator, UuidV7Generator,
};
pub use network::HieNetwork;
pub use patient::{
    DiscoveryParams, DiscoveryRequest, DiscoveryStatus, ExternalData, NetworkDiscoveryState,
    NetworkLink, PatientDemographics, PatientRecord, ScheduledDiscoveryRequest,
};
pub use result::Result;
