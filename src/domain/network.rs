//! HIE network identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Health Information Exchange network
///
/// The fixed key set of a patient's external data. Each network runs its own
/// discovery state machine independently of the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HieNetwork {
    Carequality,
    #[serde(rename = "COMMONWELL")]
    CommonWell,
}

impl HieNetwork {
    /// All networks, in dispatch order
    pub const ALL: [HieNetwork; 2] = [HieNetwork::Carequality, HieNetwork::CommonWell];

    pub fn as_str(&self) -> &'static str {
        match self {
            HieNetwork::Carequality => "CAREQUALITY",
            HieNetwork::CommonWell => "COMMONWELL",
        }
    }

    /// Short prefix used in observability contexts (`cq.patient.discover`)
    pub fn short_code(&self) -> &'static str {
        match self {
            HieNetwork::Carequality => "cq",
            HieNetwork::CommonWell => "cw",
        }
    }
}

impl fmt::Display for HieNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HieNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "carequality" | "cq" => Ok(HieNetwork::Carequality),
            "commonwell" | "cw" => Ok(HieNetwork::CommonWell),
            other => Err(format!(
                "Unknown HIE network '{other}'. Expected carequality or commonwell"
            )),
        }
    }
}
