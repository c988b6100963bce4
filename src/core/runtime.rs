//! Wiring of the orchestration core from configuration

use crate::adapters::database::{create_patient_store, PatientRecordStore};
use crate::adapters::doc_query::{DocQueryTrigger, HttpDocQueryTrigger};
use crate::adapters::hie::{HttpCarequalityGateway, HttpCommonWellClient};
use crate::config::HieConfig;
use crate::core::discovery::{
    CarequalityDriver, CommonWellDriver, CrossHieOrchestrator, DiscoveryCoordinator,
    IntervalPoller,
};
use crate::core::doc_query::{DocQueryScheduler, StalenessPolicy};
use crate::core::retry::RetryPolicy;
use crate::domain::Result;
use crate::logging::{ObservabilitySink, TracingSink};
use std::sync::Arc;

/// Fully wired orchestration core
pub struct HieRuntime {
    pub store: Arc<dyn PatientRecordStore>,
    pub coordinator: Arc<DiscoveryCoordinator>,
    pub orchestrator: CrossHieOrchestrator,
    pub doc_query_scheduler: DocQueryScheduler,
}

impl HieRuntime {
    /// Connect to the configured store and build every component
    pub async fn from_config(config: &HieConfig) -> Result<Self> {
        let store = create_patient_store(config).await?;
        Self::with_store(config, store)
    }

    /// Build every component on top of an existing store
    pub fn with_store(config: &HieConfig, store: Arc<dyn PatientRecordStore>) -> Result<Self> {
        let doc_query: Arc<dyn DocQueryTrigger> =
            Arc::new(HttpDocQueryTrigger::new(&config.doc_query)?);
        let sink: Arc<dyn ObservabilitySink> = Arc::new(TracingSink);

        let cq_driver = CarequalityDriver::new(
            Arc::new(HttpCarequalityGateway::new(&config.carequality)?),
            Arc::new(IntervalPoller::from_config(&config.carequality)),
            Arc::clone(&store),
        );
        let cw_driver = CommonWellDriver::new(
            Arc::new(HttpCommonWellClient::new(&config.commonwell)?),
            Arc::clone(&store),
            RetryPolicy::from(&config.commonwell.retry),
            Arc::clone(&sink),
        );

        let coordinator = DiscoveryCoordinator::builder(Arc::clone(&store), doc_query, sink)
            .driver(Arc::new(cq_driver), config.carequality.enabled)
            .driver(Arc::new(cw_driver), config.commonwell.enabled)
            .build();

        tracing::debug!(
            store = store.backend_name(),
            networks = ?config.enabled_networks(),
            "Orchestration core ready"
        );

        Ok(Self {
            orchestrator: CrossHieOrchestrator::new(Arc::clone(&coordinator)),
            doc_query_scheduler: DocQueryScheduler::new(
                Arc::clone(&store),
                StalenessPolicy::from_config(&config.discovery),
            ),
            coordinator,
            store,
        })
    }
}
