// HIE Orchestrator - Patient Discovery across Carequality and CommonWell
// Copyright (c) 2025 HIE Orchestrator Contributors
// Licensed under the MIT License

use clap::Parser;
use hie_orchestrator::cli::{Cli, Commands};
use hie_orchestrator::config::LoggingConfig;
use hie_orchestrator::logging::init_logging;
use std::process;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    // A missing .env is not an error
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Console only; file logging is a long-running service concern
    let log_level = cli.log_level.as_deref().unwrap_or("info");
    let _log_guard = match init_logging(log_level, &LoggingConfig::default()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "HIE Orchestrator - Patient Discovery across Carequality and CommonWell"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install SIGTERM handler, Ctrl+C only");
                    if tokio::signal::ctrl_c().await.is_ok() {
                        let _ = shutdown_tx.send(true);
                    }
                    return;
                }
            };

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT (Ctrl+C), no longer waiting on discovery");
                    println!("\n⚠️  Shutdown signal received, leaving in-flight discovery to settle on its own...");
                    let _ = shutdown_tx.send(true);
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, no longer waiting on discovery");
                    println!("\n⚠️  Shutdown signal received, leaving in-flight discovery to settle on its own...");
                    let _ = shutdown_tx.send(true);
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            } else {
                tracing::info!("Received SIGINT (Ctrl+C), no longer waiting on discovery");
                println!("\n⚠️  Shutdown signal received, leaving in-flight discovery to settle on its own...");
                let _ = shutdown_tx.send(true);
            }
        }
    });

    let exit_code = match execute_command(&cli, shutdown_rx).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            5
        }
    };

    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, shutdown_signal: watch::Receiver<bool>) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Discover(args) => args.execute(&cli.config, shutdown_signal).await,
        Commands::Status(args) => args.execute(&cli.config).await,
        Commands::ScheduleDocQuery(args) => args.execute(&cli.config, shutdown_signal).await,
        Commands::Progress(args) => args.execute(&cli.config, shutdown_signal).await,
        Commands::ResetSchedule(args) => args.execute(&cli.config).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    }
}
