//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the orchestrator configuration file.

use super::{EXIT_CONFIG, EXIT_OK};
use crate::config::{load_config, DatabaseTarget, HieConfig};
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates after env overrides are applied
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        print_summary(&config);
        Ok(EXIT_OK)
    }
}

fn print_summary(config: &HieConfig) {
    println!("Configuration Summary:");
    println!("  Log Level: {}", config.application.log_level);
    println!("  Environment: {:?}", config.environment);

    match config.database_target {
        DatabaseTarget::PostgreSQL => {
            println!("  Patient Store: PostgreSQL");
            if let Some(ref pg_config) = config.postgresql {
                println!(
                    "  PostgreSQL Host: {}",
                    pg_config
                        .connection_string
                        .expose_secret()
                        .as_str()
                        .split('@')
                        .next_back()
                        .unwrap_or("***")
                );
                println!("  Max Connections: {}", pg_config.max_connections);
            }
        }
        DatabaseTarget::Memory => println!("  Patient Store: in-memory"),
    }

    println!(
        "  Carequality: {} ({})",
        enabled_label(config.carequality.enabled),
        config.carequality.base_url
    );
    println!(
        "  Carequality Polling: every {}ms for up to {}s",
        config.carequality.poll_interval_ms, config.carequality.max_poll_seconds
    );
    println!(
        "  CommonWell: {} ({})",
        enabled_label(config.commonwell.enabled),
        config.commonwell.base_url
    );
    println!(
        "  CommonWell Link Retries: {}",
        config.commonwell.retry.max_retries
    );
    println!("  Doc Query API: {}", config.doc_query.base_url);
    println!(
        "  Stale Lookback: {}h",
        config.discovery.stale_lookback_hours
    );
    if config.discovery.stale_check_all_cx {
        println!("  Stale Check: all customers");
    } else {
        println!(
            "  Stale Check: {} customer(s)",
            config.discovery.stale_check_cx_ids.len()
        );
    }
}

fn enabled_label(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}
