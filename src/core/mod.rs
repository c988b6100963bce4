//! Core orchestration logic.
//!
//! # Modules
//!
//! - [`discovery`] - Patient discovery state machine, drivers and cross-network fan-out
//! - [`doc_query`] - Deferring document queries behind discovery
//! - [`retry`] - Retry with backoff
//! - [`runtime`] - Wiring of every component from configuration
//! - [`tasks`] - Detached background tasks
//!
//! # Discovery Workflow
//!
//! 1. **Decide**: run now, or schedule behind the run in flight
//! 2. **Start**: mark the network as processing
//! 3. **Discover**: the network driver runs in a detached task
//! 4. **Settle**: completed or failed, consuming any deferred document query
//!    and scheduled discovery
//!
//! # Example
//!
//! ```rust,no_run
//! use hie_orchestrator::core::doc_query::{DocQueryOptions, DocQueryScheduler, StalenessPolicy};
//! use hie_orchestrator::adapters::memory::InMemoryPatientStore;
//! use hie_orchestrator::config::DiscoveryConfig;
//! use hie_orchestrator::domain::{HieNetwork, PatientKey, RequestId};
//! use std::sync::Arc;
//!
//! # async fn example(key: PatientKey) -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = DocQueryScheduler::new(
//!     Arc::new(InMemoryPatientStore::new()),
//!     StalenessPolicy::from_config(&DiscoveryConfig::default()),
//! );
//!
//! let decision = scheduler
//!     .schedule_doc_query(
//!         &key,
//!         HieNetwork::Carequality,
//!         &RequestId::new("dq-1")?,
//!         DocQueryOptions::default(),
//!     )
//!     .await?;
//!
//! println!("scheduled: {}", decision.is_scheduled);
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod doc_query;
pub mod retry;
pub mod runtime;
pub mod tasks;
