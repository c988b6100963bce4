//! Domain error types
//!
//! This module defines the error hierarchy for the orchestrator.
//! Errors are domain-specific and don't expose third-party types.

use super::network::HieNetwork;
use thiserror::Error;

/// Main orchestrator error type
///
/// This is the primary error type used throughout the library. Precondition
/// failures (`PatientNotFound`, `MissingDiscoveryParams`, `NetworkNotEnabled`)
/// surface to the immediate caller and are never retried.
#[derive(Debug, Error)]
pub enum HieError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Patient record store errors
    #[error("Database error: {0}")]
    Database(String),

    /// Patient record does not exist for the customer
    #[error("Patient not found: {patient_id} (cx_id: {cx_id})")]
    PatientNotFound { cx_id: String, patient_id: String },

    /// Status update attempted on a network that was never started
    #[error("Missing discovery params for {network}")]
    MissingDiscoveryParams { network: HieNetwork },

    /// No discovery driver is registered for the network
    #[error("Network not enabled: {0}")]
    NetworkNotEnabled(HieNetwork),

    /// A run stopped before its driver settled it
    #[error("Discovery on {network} abandoned before settling (request {request_id})")]
    RunAbandoned {
        network: HieNetwork,
        request_id: String,
    },

    /// HIE gateway errors
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Document query collaborator errors
    #[error("Document query error: {0}")]
    DocQuery(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl HieError {
    /// Returns true for caller-misuse errors that should never be retried
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            HieError::PatientNotFound { .. }
                | HieError::MissingDiscoveryParams { .. }
                | HieError::NetworkNotEnabled(_)
                | HieError::Validation(_)
        )
    }
}

/// HIE network errors
///
/// Errors raised by the Carequality gateway, the CommonWell API and the
/// internal document query endpoint.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Failed to connect
    #[error("Failed to connect: {0}")]
    ConnectionFailed(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Response could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::ConnectionFailed(_) | GatewayError::Timeout(_) => true,
            GatewayError::ServerError { .. } => true,
            GatewayError::ClientError { status, .. } => *status == 429,
            GatewayError::InvalidResponse(_) => false,
        }
    }
}

impl From<std::io::Error> for HieError {
    fn from(err: std::io::Error) -> Self {
        HieError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for HieError {
    fn from(err: serde_json::Error) -> Self {
        HieError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for HieError {
    fn from(err: toml::de::Error) -> Self {
        HieError::Configuration(format!("TOML parse error: {err}"))
    }
}
