//! Patient discovery orchestration
//!
//! Each network runs its own discovery state machine on the patient record:
//!
//! ```text
//! (none) --start--> processing --settle--> completed | failed
//!                       ^                        |
//!                       +---- scheduled run -----+  (completed only)
//! ```
//!
//! - [`StatusTracker`] is the only writer of the status
//! - [`DiscoveryScheduler`] keeps at most one pending request per network
//! - [`DiscoveryCoordinator`] decides run-or-schedule, launches drivers as
//!   detached tasks and processes their progress
//! - [`CrossHieOrchestrator`] fans a request out to every network
//!
//! # Example
//!
//! ```rust,no_run
//! use hie_orchestrator::adapters::doc_query::DocQueryTrigger;
//! use hie_orchestrator::adapters::memory::InMemoryPatientStore;
//! use hie_orchestrator::core::discovery::{
//!     CrossHieOrchestrator, DiscoveryCoordinator, DiscoveryDriver, DiscoveryFlags,
//! };
//! use hie_orchestrator::domain::{FacilityId, PatientKey};
//! use hie_orchestrator::logging::TracingSink;
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     cq: Arc<dyn DiscoveryDriver>,
//! #     cw: Arc<dyn DiscoveryDriver>,
//! #     doc_query: Arc<dyn DocQueryTrigger>,
//! #     key: PatientKey,
//! # ) {
//! let coordinator = DiscoveryCoordinator::builder(
//!     Arc::new(InMemoryPatientStore::new()),
//!     doc_query,
//!     Arc::new(TracingSink),
//! )
//! .driver(cq, true)
//! .driver(cw, true)
//! .build();
//!
//! let orchestrator = CrossHieOrchestrator::new(coordinator);
//! let report = orchestrator
//!     .run_or_schedule_across_networks(
//!         &key,
//!         &FacilityId::new("fac-1").unwrap(),
//!         &DiscoveryFlags::default(),
//!         None,
//!     )
//!     .await;
//! println!("request {} failed on {} networks", report.request_id, report.failures());
//! # }
//! ```

pub mod carequality;
pub mod commonwell;
pub mod coordinator;
pub mod decision;
pub mod driver;
pub mod orchestrator;
pub mod poller;
pub mod progress;
pub mod rerun;
pub mod scheduler;
pub mod status;

pub use carequality::CarequalityDriver;
pub use commonwell::CommonWellDriver;
pub use coordinator::{DiscoveryCoordinator, DiscoveryCoordinatorBuilder};
pub use decision::{decide, Decision, RunOrScheduleOutcome};
pub use driver::DiscoveryDriver;
pub use orchestrator::{CrossHieOrchestrator, CrossNetworkReport, DiscoveryFlags, NetworkDispatch};
pub use poller::{IntervalPoller, ResultPoller};
pub use scheduler::DiscoveryScheduler;
pub use status::{ScheduledDocQuery, StatusTracker, StatusTransition};
