//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use super::{EXIT_CONFIG, EXIT_FATAL, EXIT_OK};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "hie-orchestrator.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing HIE Orchestrator configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG);
        }

        match fs::write(&self.output, Self::generate_config()) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your gateway URLs", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - Set HIE_PG_CONNECTION_STRING");
                println!("     - Set HIE_CQ_API_KEY and HIE_CW_API_KEY");
                println!("  3. Apply migrations/001_initial_schema.sql to the database");
                println!("  4. Validate configuration: hie-orchestrator validate-config");
                println!();
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }

    fn generate_config() -> &'static str {
        r#"# HIE Orchestrator Configuration File
# Patient Discovery across Carequality and CommonWell

# Runtime environment: development | staging | production
# Production requires https:// gateway URLs
environment = "development"

# Patient record store: postgresql | memory
database_target = "postgresql"

[application]
log_level = "info"

[postgresql]
connection_string = "${HIE_PG_CONNECTION_STRING}"
max_connections = 10
connection_timeout_seconds = 30
statement_timeout_seconds = 60

[carequality]
enabled = true
base_url = "https://ihe-gateway.internal"
api_key = "${HIE_CQ_API_KEY}"
timeout_seconds = 30
# Result polling after the gateway fan-out
poll_interval_ms = 3000
max_poll_seconds = 120

[commonwell]
enabled = true
base_url = "https://commonwell-proxy.internal"
api_key = "${HIE_CW_API_KEY}"
timeout_seconds = 30

[commonwell.retry]
max_retries = 3
initial_delay_ms = 1000
max_delay_ms = 30000
backoff_multiplier = 2.0

[doc_query]
base_url = "http://api.internal:8080"
timeout_seconds = 30

[discovery]
# Discovery older than this is re-run before a document query
stale_lookback_hours = 24
stale_check_cx_ids = []
stale_check_all_cx = false

[logging]
local_enabled = false
local_path = "/var/log/hie-orchestrator"
local_rotation = "daily"
"#
    }
}
