//! Discovery coordinator
//!
//! Owns the status tracker, the scheduler and one driver per network, and
//! runs drivers as detached tasks whose settlement is routed back into
//! progress processing. The run-or-schedule decision and progress
//! processing are implemented on this type in their own modules.

use super::driver::DiscoveryDriver;
use super::scheduler::DiscoveryScheduler;
use super::status::StatusTracker;
use crate::adapters::database::PatientRecordStore;
use crate::adapters::doc_query::DocQueryTrigger;
use crate::core::tasks::{spawn_detached, TaskSet};
use crate::domain::{
    DiscoveryRequest, DiscoveryStatus, HieError, HieNetwork, PatientKey, PatientRecord, RequestId,
    Result,
};
use crate::log_discovery_start;
use crate::logging::{ErrorContext, ObservabilitySink};
use chrono::Utc;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The driver run a tracked task belongs to
#[derive(Debug, Clone)]
struct InFlightRun {
    network: HieNetwork,
    key: PatientKey,
    request_id: RequestId,
}

struct RegisteredDriver {
    driver: Arc<dyn DiscoveryDriver>,
    enabled: bool,
}

/// Entry point for starting and settling discovery runs
pub struct DiscoveryCoordinator {
    pub(super) store: Arc<dyn PatientRecordStore>,
    pub(super) tracker: StatusTracker,
    pub(super) scheduler: DiscoveryScheduler,
    pub(super) doc_query: Arc<dyn DocQueryTrigger>,
    pub(super) sink: Arc<dyn ObservabilitySink>,
    drivers: BTreeMap<HieNetwork, RegisteredDriver>,
    tasks: TaskSet<InFlightRun>,
}

/// Builder for [`DiscoveryCoordinator`]
pub struct DiscoveryCoordinatorBuilder {
    store: Arc<dyn PatientRecordStore>,
    doc_query: Arc<dyn DocQueryTrigger>,
    sink: Arc<dyn ObservabilitySink>,
    drivers: BTreeMap<HieNetwork, RegisteredDriver>,
}

impl DiscoveryCoordinatorBuilder {
    /// Register the driver of its network, replacing any earlier one
    ///
    /// A disabled driver only runs for requests with `force_enabled` set.
    pub fn driver(mut self, driver: Arc<dyn DiscoveryDriver>, enabled: bool) -> Self {
        self.drivers
            .insert(driver.network(), RegisteredDriver { driver, enabled });
        self
    }

    pub fn build(self) -> Arc<DiscoveryCoordinator> {
        Arc::new(DiscoveryCoordinator {
            tracker: StatusTracker::new(Arc::clone(&self.store)),
            scheduler: DiscoveryScheduler::new(Arc::clone(&self.store)),
            store: self.store,
            doc_query: self.doc_query,
            sink: self.sink,
            drivers: self.drivers,
            tasks: TaskSet::new(),
        })
    }
}

impl DiscoveryCoordinator {
    pub fn builder(
        store: Arc<dyn PatientRecordStore>,
        doc_query: Arc<dyn DocQueryTrigger>,
        sink: Arc<dyn ObservabilitySink>,
    ) -> DiscoveryCoordinatorBuilder {
        DiscoveryCoordinatorBuilder {
            store,
            doc_query,
            sink,
            drivers: BTreeMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn PatientRecordStore> {
        &self.store
    }

    pub fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    pub fn scheduler(&self) -> &DiscoveryScheduler {
        &self.scheduler
    }

    /// Networks with a registered driver
    pub fn networks(&self) -> Vec<HieNetwork> {
        self.drivers.keys().copied().collect()
    }

    /// Whether the network's driver runs without `force_enabled`
    pub fn is_enabled(&self, network: HieNetwork) -> bool {
        self.drivers.get(&network).is_some_and(|d| d.enabled)
    }

    /// Wait until every detached run and deferred query has finished,
    /// including runs chained from them
    pub async fn wait_idle(&self) {
        self.tasks.wait_idle().await;
    }

    /// Detached tasks still running
    pub fn pending_tasks(&self) -> usize {
        self.tasks.pending()
    }

    /// Stop every driver run still in flight and settle it as failed
    ///
    /// For hosts that stop waiting before the runs settle. A run is only
    /// settled when its network is still processing under the run's request
    /// ID; settling goes through progress processing, so whatever was
    /// scheduled behind the run is cleared. Deferred document queries keep
    /// running. Returns the number of runs settled.
    pub async fn fail_abandoned_runs(self: &Arc<Self>) -> usize {
        let mut failed = 0;
        loop {
            let runs = self.tasks.abort_labelled().await;
            if runs.is_empty() {
                return failed;
            }
            for run in runs {
                if self.fail_abandoned_run(run).await {
                    failed += 1;
                }
            }
        }
    }

    async fn fail_abandoned_run(self: &Arc<Self>, run: InFlightRun) -> bool {
        let InFlightRun {
            network,
            key,
            request_id,
        } = run;

        let still_processing = match self.store.get_patient(&key).await {
            Ok(patient) => patient.network_state(network).is_some_and(|state| {
                state.is_processing()
                    && state
                        .discovery_params
                        .as_ref()
                        .is_some_and(|p| p.request_id == request_id)
            }),
            Err(e) => {
                self.capture(network, &key, "fail_abandoned_run", &e);
                return false;
            }
        };
        if !still_processing {
            return false;
        }

        self.sink.capture_error(
            &HieError::RunAbandoned {
                network,
                request_id: request_id.to_string(),
            },
            &ErrorContext::new(format!("{}.patient.discover", network.short_code()))
                .with_patient(&key.cx_id, &key.patient_id)
                .with_network(network)
                .with_request_id(&request_id),
        );
        self.process_discovery_progress(network, &key, DiscoveryStatus::Failed)
            .await
            .is_some()
    }

    fn driver_for(
        &self,
        network: HieNetwork,
        request: &DiscoveryRequest,
    ) -> Result<Arc<dyn DiscoveryDriver>> {
        match self.drivers.get(&network) {
            Some(registered) if registered.enabled || request.force_enabled => {
                Ok(Arc::clone(&registered.driver))
            }
            _ => Err(HieError::NetworkNotEnabled(network)),
        }
    }

    /// Start a discovery run on `network`
    ///
    /// Writes the start transition, then runs the driver in a detached task.
    /// Returns once the run is started, not when it settles.
    ///
    /// # Errors
    ///
    /// `HieError::NetworkNotEnabled` when no usable driver is registered, or
    /// the store error of the start transition. Driver failures never
    /// surface here; they settle the run as failed.
    pub async fn launch(
        self: &Arc<Self>,
        network: HieNetwork,
        patient: &PatientRecord,
        request: DiscoveryRequest,
    ) -> Result<()> {
        let driver = self.driver_for(network, &request)?;
        let key = patient.key();

        log_discovery_start!(network, key, request.request_id);
        let started = self
            .tracker
            .start_discovery(network, &key, request.to_params(Utc::now()))
            .await?;

        self.spawn_run(driver, started, request);
        Ok(())
    }

    fn spawn_run(
        self: &Arc<Self>,
        driver: Arc<dyn DiscoveryDriver>,
        patient: PatientRecord,
        request: DiscoveryRequest,
    ) {
        let label = InFlightRun {
            network: driver.network(),
            key: patient.key(),
            request_id: request.request_id.clone(),
        };
        let coordinator = Arc::clone(self);
        let run: BoxFuture<'static, Result<()>> = Box::pin(async move {
            let network = driver.network();
            let key = patient.key();

            let status = match driver.discover(&patient, &request).await {
                Ok(()) => {
                    if request.rerun_pd_on_new_demographics
                        && coordinator
                            .rerun_on_new_demographics(network, &key, &request)
                            .await
                    {
                        return Ok(());
                    }
                    DiscoveryStatus::Completed
                }
                Err(e) => {
                    coordinator.sink.capture_error(
                        &e,
                        &ErrorContext::new(format!("{}.patient.discover", network.short_code()))
                            .with_patient(&key.cx_id, &key.patient_id)
                            .with_network(network)
                            .with_request_id(&request.request_id),
                    );
                    DiscoveryStatus::Failed
                }
            };

            coordinator
                .process_discovery_progress(network, &key, status)
                .await;
            Ok(())
        });

        self.tasks
            .track_labelled(spawn_detached("patient_discovery", run), label);
    }

    pub(super) fn track(&self, handle: tokio::task::JoinHandle<()>) {
        self.tasks.track(handle);
    }
}
