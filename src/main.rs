//! Main entry point for the mmlogic service
//!
//! This is the production entry point that initializes and runs the
//! matchmaking logic API with proper error handling, logging, and graceful
//! shutdown.

use anyhow::Result;
use clap::Parser;
use mmlogic::config::{validate_config, AppConfig};
use mmlogic::service::{AppState, HealthCheck, HealthStatus, ServiceContext};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::time::Duration;
use tracing::{error, info, warn};

/// mmlogic - Matchmaking Logic API
#[derive(Parser)]
#[command(
    name = "mmlogic",
    version,
    about = "Matchmaking logic tier: player pools, ignorelists and proposals",
    long_about = "mmlogic resolves attribute-range filters into pools of eligible players, \
                 keeps ignorelists of players already proposed, and hands match proposals \
                 from matchmaking functions to the evaluator queue."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Perform health check and exit
    #[arg(long, help = "Perform a health check and exit with status code")]
    health_check: bool,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// API port override
    #[arg(long, value_name = "PORT", help = "Override matchmaking logic API port")]
    api_port: Option<u16>,

    /// Health port override
    #[arg(long, value_name = "PORT", help = "Override health and metrics port")]
    health_port: Option<u16>,

    /// Page size override
    #[arg(long, value_name = "PLAYERS", help = "Override players per streamed page")]
    page_size: Option<usize>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Perform health check and return appropriate exit code
async fn perform_health_check(config: AppConfig) -> Result<()> {
    info!("Performing health check...");

    let app_state = AppState::new(config).await?;
    app_state.context().set_running(true).await;

    match HealthCheck::check(app_state.context()).await {
        Ok(health) => {
            println!("Health Check: {}", health.status);
            for check in &health.checks {
                println!("  {}: {}", check.name, check.status);
            }
            println!("  Proposals Queued: {}", health.stats.proposals_queued);
            println!("  Workers In Flight: {}", health.stats.workers_in_flight);
            for (name, size) in &health.stats.ignorelists {
                println!("  Ignorelist {}: {} players", name, size);
            }
            println!("  Uptime: {}s", health.stats.uptime_seconds);

            if health.status == HealthStatus::Healthy {
                std::process::exit(0);
            } else {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Run periodic health checks
async fn health_check_task(context: Arc<ServiceContext>) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));

    while context.is_running().await {
        interval.tick().await;

        match HealthCheck::check(context.clone()).await {
            Ok(health) => {
                info!(
                    "Health check: {} - {} proposals queued, {} workers in flight",
                    health.status, health.stats.proposals_queued, health.stats.workers_in_flight
                );
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
            }
        }
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🚀 mmlogic Matchmaking Logic Service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   API port: {}", config.service.api_port);
    info!("   Health port: {}", config.service.health_port);
    info!(
        "   Page size: {} (batch {})",
        config.pool.page_size, config.pool.batch_size
    );
    info!("   Proposal queue: {}", config.proposals.queue_name);
    info!(
        "   Ignorelists: {}",
        config
            .ignore_lists
            .iter()
            .map(|l| l.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(api_port) = args.api_port {
        config.service.api_port = api_port;
    }

    if let Some(health_port) = args.health_port {
        config.service.health_port = health_port;
    }

    if let Some(page_size) = args.page_size {
        config.pool.page_size = page_size;
    }

    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.health_check {
        return perform_health_check(config).await;
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    info!("Initializing service components...");
    let mut app_state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting service...");
    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    let health_task = {
        let context = app_state.context();
        tokio::spawn(async move {
            health_check_task(context).await;
        })
    };

    info!("✅ mmlogic service is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;

    info!("🛑 Shutdown signal received, beginning graceful shutdown...");
    health_task.abort();

    match tokio::time::timeout(config.shutdown_timeout(), app_state.shutdown()).await {
        Ok(Ok(())) => {
            info!("✅ Graceful shutdown completed successfully");
        }
        Ok(Err(e)) => {
            error!("Shutdown failed: {}", e);
        }
        Err(_) => {
            warn!("⚠️  Shutdown timeout exceeded, forcing exit");
        }
    }

    info!("🛑 mmlogic service stopped");
    Ok(())
}
