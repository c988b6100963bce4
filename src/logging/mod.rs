//! Logging and observability
//!
//! - JSON or console logs through `tracing` ([`init_logging`])
//! - Error capture through an [`ObservabilitySink`]
//! - Helper macros for recurring events
//!
//! # Example
//!
//! ```no_run
//! use hie_orchestrator::logging::init_logging;
//! use hie_orchestrator::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(network = "CAREQUALITY", "Discovery started");
//! ```

pub mod capture;
pub mod structured;

pub use capture::{
    CapturedError, ErrorContext, ObservabilitySink, RecordingSink, TracingSink,
};
pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log the start of a discovery run
///
/// # Example
///
/// ```no_run
/// use hie_orchestrator::log_discovery_start;
/// use hie_orchestrator::domain::{HieNetwork, PatientKey, RequestId};
///
/// # fn example(key: &PatientKey) {
/// let request_id = RequestId::new("req-1").unwrap();
/// log_discovery_start!(HieNetwork::Carequality, key, &request_id);
/// # }
/// ```
#[macro_export]
macro_rules! log_discovery_start {
    ($network:expr, $key:expr, $request_id:expr) => {
        tracing::info!(
            network = %$network,
            cx_id = %$key.cx_id,
            patient_id = %$key.patient_id,
            request_id = %$request_id,
            "Starting patient discovery"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use hie_orchestrator::log_error_with_context;
/// use hie_orchestrator::domain::HieError;
///
/// let error = HieError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use hie_orchestrator::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "cw.get_links", "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $operation:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            operation = $operation,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
