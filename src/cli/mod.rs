//! CLI interface and argument parsing
//!
//! This module provides the operator command-line interface using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// HIE Orchestrator - Patient Discovery across Carequality and CommonWell
#[derive(Parser, Debug)]
#[command(name = "hie-orchestrator")]
#[command(version, about, long_about = None)]
#[command(author = "HIE Orchestrator Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "hie-orchestrator.toml", env = "HIE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "HIE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run or schedule patient discovery on every enabled network
    Discover(commands::discover::DiscoverArgs),

    /// Show per-network discovery state
    Status(commands::status::StatusArgs),

    /// Defer a document query until discovery settles
    ScheduleDocQuery(commands::schedule_doc_query::ScheduleDocQueryArgs),

    /// Settle a discovery run by hand
    Progress(commands::progress::ProgressArgs),

    /// Clear a scheduled discovery request
    ResetSchedule(commands::reset_schedule::ResetScheduleArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
