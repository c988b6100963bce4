//! External system integrations.
//!
//! This module provides adapters for the collaborators of the orchestration
//! core:
//!
//! - [`database`] - Patient record store abstraction (trait-based)
//! - [`memory`] - In-process store
//! - [`postgresql`] - PostgreSQL store with row-level locking
//! - [`hie`] - Carequality and CommonWell network clients
//! - [`doc_query`] - Document query pipeline trigger
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with fake implementations. Every collaborator is a trait
//! object injected into the core.
//!
//! # Network Clients
//!
//! ```rust,no_run
//! use hie_orchestrator::adapters::hie::{CommonWellClient, HttpCommonWellClient};
//! use hie_orchestrator::config::{CommonWellConfig, RetryConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpCommonWellClient::new(&CommonWellConfig {
//!     enabled: true,
//!     base_url: "https://commonwell-proxy.internal".to_string(),
//!     api_key: None,
//!     timeout_seconds: 30,
//!     retry: RetryConfig::default(),
//! })?;
//!
//! let links = client.get_patient_links("cw-123").await?;
//! println!("{} links", links.len());
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod doc_query;
pub mod hie;
pub mod memory;
pub mod postgresql;
