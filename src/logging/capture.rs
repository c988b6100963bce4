//! Error capture sink
//!
//! Every place in the orchestration core that swallows an error reports it
//! here first. [`TracingSink`] forwards to `tracing`; [`RecordingSink`] keeps
//! the captures in memory for embedding hosts and tests.

use crate::domain::{CxId, HieError, HieNetwork, PatientId, RequestId};
use std::sync::Mutex;

/// Where a captured error came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Operation name, e.g. `cq.patient.discover`
    pub context: String,
    pub cx_id: Option<CxId>,
    pub patient_id: Option<PatientId>,
    pub network: Option<HieNetwork>,
    pub request_id: Option<RequestId>,
}

impl ErrorContext {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            ..Self::default()
        }
    }

    pub fn with_patient(mut self, cx_id: &CxId, patient_id: &PatientId) -> Self {
        self.cx_id = Some(cx_id.clone());
        self.patient_id = Some(patient_id.clone());
        self
    }

    pub fn with_network(mut self, network: HieNetwork) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_request_id(mut self, request_id: &RequestId) -> Self {
        self.request_id = Some(request_id.clone());
        self
    }
}

/// Fire-and-forget observability collaborator
pub trait ObservabilitySink: Send + Sync {
    fn log(&self, message: &str);

    fn capture_error(&self, error: &HieError, context: &ErrorContext);
}

/// Sink that emits `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

fn display_opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

impl ObservabilitySink for TracingSink {
    fn log(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn capture_error(&self, error: &HieError, context: &ErrorContext) {
        tracing::error!(
            context = %context.context,
            cx_id = %display_opt(&context.cx_id),
            patient_id = %display_opt(&context.patient_id),
            network = %display_opt(&context.network),
            request_id = %display_opt(&context.request_id),
            error = %error,
            "Captured error"
        );
    }
}

/// A captured error as kept by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedError {
    pub message: String,
    pub context: ErrorContext,
}

/// Sink that keeps messages and errors in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
    errors: Mutex<Vec<CapturedError>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<CapturedError> {
        self.errors.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ObservabilitySink for RecordingSink {
    fn log(&self, message: &str) {
        tracing::info!("{}", message);
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }

    fn capture_error(&self, error: &HieError, context: &ErrorContext) {
        TracingSink.capture_error(error, context);
        if let Ok(mut errors) = self.errors.lock() {
            errors.push(CapturedError {
                message: error.to_string(),
                context: context.clone(),
            });
        }
    }
}
