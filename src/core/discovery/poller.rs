//! Waiting for outbound discovery results
//!
//! Gateways answer asynchronously. The poller fetches the responses received
//! so far every interval until either every contacted gateway answered or
//! the deadline passes, whichever comes first.

use crate::adapters::hie::{CarequalityGateway, OutboundDiscoveryResponse};
use crate::config::CarequalityConfig;
use crate::domain::{RequestId, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

#[async_trait]
pub trait ResultPoller: Send + Sync {
    /// Wait for up to `expected` responses to `request_id`
    async fn wait_for(
        &self,
        gateway: &dyn CarequalityGateway,
        request_id: &RequestId,
        expected: usize,
    ) -> Result<Vec<OutboundDiscoveryResponse>>;
}

/// Fixed-interval poller bounded by a total wait
#[derive(Debug, Clone)]
pub struct IntervalPoller {
    interval: Duration,
    max_wait: Duration,
}

impl IntervalPoller {
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }

    pub fn from_config(config: &CarequalityConfig) -> Self {
        Self::new(
            Duration::from_millis(config.poll_interval_ms),
            Duration::from_secs(config.max_poll_seconds),
        )
    }
}

#[async_trait]
impl ResultPoller for IntervalPoller {
    async fn wait_for(
        &self,
        gateway: &dyn CarequalityGateway,
        request_id: &RequestId,
        expected: usize,
    ) -> Result<Vec<OutboundDiscoveryResponse>> {
        let deadline = Instant::now() + self.max_wait;
        let mut latest: Option<Vec<OutboundDiscoveryResponse>> = None;
        let mut polls = 0u32;

        loop {
            polls += 1;
            match gateway.get_outbound_discovery_results(request_id).await {
                Ok(responses) => {
                    if responses.len() >= expected {
                        tracing::debug!(
                            request_id = %request_id,
                            received = responses.len(),
                            polls,
                            "All gateways responded"
                        );
                        return Ok(responses);
                    }
                    latest = Some(responses);
                }
                Err(e) if latest.is_none() && Instant::now() + self.interval >= deadline => {
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(request_id = %request_id, error = %e, "Result poll failed");
                }
            }

            if Instant::now() + self.interval >= deadline {
                break;
            }
            tokio::time::sleep(self.interval).await;
        }

        let responses = latest.unwrap_or_default();
        tracing::info!(
            request_id = %request_id,
            expected,
            received = responses.len(),
            polls,
            "Stopped waiting for gateway responses"
        );
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::hie::OutboundDiscoveryRequest;
    use crate::domain::{GatewayError, HieError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Gateway whose result count grows by one per poll
    struct TricklingGateway {
        polls: AtomicUsize,
        fail_first: bool,
    }

    impl TricklingGateway {
        fn new(fail_first: bool) -> Self {
            Self {
                polls: AtomicUsize::new(0),
                fail_first,
            }
        }
    }

    fn response(i: usize) -> OutboundDiscoveryResponse {
        OutboundDiscoveryResponse {
            gateway_org_id: format!("1.2.{i}"),
            gateway_org_name: None,
            gateway_url: None,
            patient_match: false,
            external_patient: None,
            patient_demographics: None,
        }
    }

    #[async_trait]
    impl CarequalityGateway for TricklingGateway {
        async fn start_outbound_discovery(&self, _: &OutboundDiscoveryRequest) -> Result<usize> {
            Ok(0)
        }

        async fn get_outbound_discovery_results(
            &self,
            _: &RequestId,
        ) -> Result<Vec<OutboundDiscoveryResponse>> {
            let poll = self.polls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && poll == 0 {
                return Err(GatewayError::Timeout("slow".to_string()).into());
            }
            Ok((0..=poll).map(response).collect())
        }
    }

    fn request_id() -> RequestId {
        RequestId::new("req").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_when_all_responded() {
        let gateway = TricklingGateway::new(false);
        let poller = IntervalPoller::new(Duration::from_secs(1), Duration::from_secs(60));

        let results = poller.wait_for(&gateway, &request_id(), 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(gateway.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_partial_results_at_deadline() {
        let gateway = TricklingGateway::new(false);
        let poller = IntervalPoller::new(Duration::from_secs(1), Duration::from_millis(2500));

        let results = poller.wait_for(&gateway, &request_id(), 10).await.unwrap();
        assert!(results.len() < 10);
        assert!(!results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_error_is_tolerated() {
        let gateway = TricklingGateway::new(true);
        let poller = IntervalPoller::new(Duration::from_secs(1), Duration::from_secs(30));

        let results = poller.wait_for(&gateway, &request_id(), 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_without_results_propagates() {
        let gateway = TricklingGateway::new(true);
        let poller = IntervalPoller::new(Duration::from_secs(5), Duration::from_secs(1));

        let err = poller.wait_for(&gateway, &request_id(), 2).await.unwrap_err();
        assert!(matches!(err, HieError::Gateway(GatewayError::Timeout(_))));
    }
}
