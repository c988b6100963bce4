//! Domain identifier types with validation
//!
//! Newtype wrappers keep customer, patient, facility and request identifiers
//! from being mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, rejecting blank strings
            pub fn new(id: impl Into<String>) -> Result<Self, String> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(concat!($label, " cannot be empty").to_string());
                }
                Ok(Self(id))
            }

            /// Returns the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes self and returns the inner String
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Customer (tenant) identifier
    ///
    /// # Examples
    ///
    /// ```
    /// use hie_orchestrator::domain::ids::CxId;
    ///
    /// let cx_id = CxId::new("0b5e6c1a-cx").unwrap();
    /// assert_eq!(cx_id.as_str(), "0b5e6c1a-cx");
    /// assert!(CxId::new("  ").is_err());
    /// ```
    CxId,
    "Customer ID"
);

string_id!(
    /// Patient identifier, unique within a customer
    PatientId,
    "Patient ID"
);

string_id!(
    /// Facility the discovery runs under
    FacilityId,
    "Facility ID"
);

string_id!(
    /// Correlation ID for a discovery or document query request
    RequestId,
    "Request ID"
);

impl RequestId {
    /// Generates a fresh time-ordered request ID (UUID v7)
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }
}

/// Composite key of a patient record: `(cx_id, patient_id)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatientKey {
    pub cx_id: CxId,
    pub patient_id: PatientId,
}

impl PatientKey {
    pub fn new(cx_id: CxId, patient_id: PatientId) -> Self {
        Self { cx_id, patient_id }
    }
}

impl fmt::Display for PatientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cx_id, self.patient_id)
    }
}

/// Source of correlation IDs for top-level discovery requests
pub trait RequestIdGenerator: Send + Sync {
    fn next_id(&self) -> RequestId;
}

/// Default generator producing UUID v7 strings
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV7Generator;

impl RequestIdGenerator for UuidV7Generator {
    fn next_id(&self) -> RequestId {
        RequestId::generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ids_rejected() {
        assert!(CxId::new("").is_err());
        assert!(PatientId::new("   ").is_err());
        assert_eq!(
            FacilityId::new("").unwrap_err(),
            "Facility ID cannot be empty"
        );
    }

    #[test]
    fn test_from_str_and_display() {
        let id: PatientId = "pt-1".parse().unwrap();
        assert_eq!(id.to_string(), "pt-1");
        assert_eq!(id.into_inner(), "pt-1");
    }

    #[test]
    fn test_generated_request_ids_are_v7() {
        let generator = UuidV7Generator;
        let first = generator.next_id();
        let second = generator.next_id();
        assert_ne!(first, second);
        let parsed = uuid::Uuid::parse_str(first.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = RequestId::new("req-1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"req-1\"");
    }

    #[test]
    fn test_patient_key_display() {
        let key = PatientKey::new(CxId::new("cx").unwrap(), PatientId::new("pt").unwrap());
        assert_eq!(key.to_string(), "cx/pt");
    }
}
