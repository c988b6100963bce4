// HIE Orchestrator - Patient Discovery across Carequality and CommonWell
// Copyright (c) 2025 HIE Orchestrator Contributors
// Licensed under the MIT License

//! # HIE Orchestrator - Patient Discovery across Carequality and CommonWell
//!
//! HIE Orchestrator runs Patient Discovery for a patient on the Carequality
//! and CommonWell health information exchange networks, and keeps the
//! per-network discovery state that gates document queries.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Deciding** whether a discovery request runs now or is scheduled behind
//!   an in-flight run
//! - **Tracking** the per-network status (`processing`, `completed`, `failed`)
//!   on the patient record
//! - **Chaining** the scheduled discovery and the deferred document query once
//!   a run settles
//! - **Fanning out** one request to every enabled network under a shared
//!   request ID
//!
//! ## Architecture
//!
//! - [`cli`] - Operator command-line interface
//! - [`core`] - Discovery state machine, doc query scheduling, retries
//! - [`adapters`] - Patient store backends and network clients
//! - [`domain`] - Identifiers, patient record and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and error capture
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hie_orchestrator::config::load_config;
//! use hie_orchestrator::core::discovery::DiscoveryFlags;
//! use hie_orchestrator::core::runtime::HieRuntime;
//! use hie_orchestrator::domain::{CxId, FacilityId, PatientId, PatientKey};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("hie-orchestrator.toml")?;
//!     let runtime = HieRuntime::from_config(&config).await?;
//!
//!     let key = PatientKey::new(CxId::new("cx-1")?, PatientId::new("pt-1")?);
//!     let report = runtime
//!         .orchestrator
//!         .run_or_schedule_across_networks(
//!             &key,
//!             &FacilityId::new("fac-1")?,
//!             &DiscoveryFlags::default(),
//!             None,
//!         )
//!         .await;
//!
//!     runtime.coordinator.wait_idle().await;
//!     println!("request {} done, {} failures", report.request_id, report.failures());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Library code returns [`domain::HieError`]; the binary wraps it in `anyhow`
//! at the command boundary.
//!
//! ## Logging
//!
//! Structured logging uses the `tracing` crate. Failures inside detached
//! discovery runs are reported through [`logging::ObservabilitySink`] with the
//! patient, network and request ID attached.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
