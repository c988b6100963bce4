//! Configuration management.
//!
//! TOML configuration with `${VAR_NAME}` substitution, `HIE_*` environment
//! overrides and validation on load.
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "production"
//! database_target = "postgresql"
//!
//! [postgresql]
//! connection_string = "${HIE_PG_CONNECTION_STRING}"
//!
//! [carequality]
//! base_url = "https://ihe-gateway.internal"
//! api_key = "${HIE_CQ_API_KEY}"
//! poll_interval_ms = 3000
//! max_poll_seconds = 120
//!
//! [commonwell]
//! base_url = "https://commonwell.internal"
//!
//! [doc_query]
//! base_url = "http://api.internal:8080"
//!
//! [discovery]
//! stale_lookback_hours = 24
//! stale_check_cx_ids = ["0b5e6c1a-cx"]
//! ```
//!
//! ```rust,no_run
//! use hie_orchestrator::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("hie-orchestrator.toml")?;
//! println!("Carequality gateway: {}", config.carequality.base_url);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, CarequalityConfig, CommonWellConfig, DatabaseTarget, DiscoveryConfig,
    DocQueryConfig, Environment, HieConfig, LoggingConfig, PostgreSQLConfig, RetryConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
