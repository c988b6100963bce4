//! Result type alias for orchestrator operations

use super::errors::HieError;

/// Result type alias using `HieError` as the error type
///
/// # Examples
///
/// ```
/// use hie_orchestrator::domain::result::Result;
/// use hie_orchestrator::domain::errors::HieError;
///
/// fn failing_function() -> Result<()> {
///     Err(HieError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, HieError>;
