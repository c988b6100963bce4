//! Per-network discovery driver

use crate::domain::{DiscoveryRequest, HieNetwork, PatientRecord, Result};
use async_trait::async_trait;

/// Network-specific patient discovery procedure
///
/// A driver performs the matching against its network and persists the
/// links it finds. It never writes the discovery status: the coordinator
/// settles the run as completed when `discover` returns `Ok` and as failed
/// when it returns an error.
#[async_trait]
pub trait DiscoveryDriver: Send + Sync {
    fn network(&self) -> HieNetwork;

    async fn discover(&self, patient: &PatientRecord, request: &DiscoveryRequest) -> Result<()>;
}
