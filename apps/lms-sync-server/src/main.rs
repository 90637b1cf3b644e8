use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lms_sync::{
    config::{LmsSyncConfig, SENSITIVE_KEYS},
    LmsSync,
};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const MODULE_NAME: &str = "lms_sync";

/// LMS Sync Server - provisions chat channels, users and memberships for an LMS
#[derive(Parser)]
#[command(name = "lms-sync-server")]
#[command(about = "LMS Sync Server - provisions chat channels, users and memberships for an LMS")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    let config = load_config(&args)?;

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("LMS Sync Server starting");

    if cli.print_config {
        println!("{}", config.to_redacted_yaml(SENSITIVE_KEYS)?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(&config),
    }
}

/// Loads the layered configuration and applies CLI overrides.
fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let mut config = AppConfig::load_or_default(args.config.as_deref())?;
    config.apply_cli_overrides(args);
    Ok(config)
}

fn gateway_config(config: &AppConfig) -> Result<LmsSyncConfig> {
    let cfg: LmsSyncConfig = config.module_config(MODULE_NAME)?;
    cfg.validate()
        .with_context(|| format!("invalid '{MODULE_NAME}' module configuration"))?;
    Ok(cfg)
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    let gateway = Arc::new(LmsSync::with_rest_platform(gateway_config(&config)?)?);

    let timeout = match config.server.timeout_sec {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let router = gateway.router(timeout);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("HTTP server bound on {}", addr);

    spawn_reload_on_hangup(gateway.clone(), args);

    axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_shutdown())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = tokio::signal::ctrl_c() => {},
                }
            }
            Err(e) => {
                tracing::warn!("shutdown: SIGTERM handler unavailable ({e}); waiting for ctrl_c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("shutdown: signal received");
}

/// On SIGHUP, re-reads the configuration and swaps in the new secret and
/// service identity. A broken file keeps the current settings.
#[cfg(unix)]
fn spawn_reload_on_hangup(gateway: Arc<LmsSync>, args: CliArgs) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangups = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("SIGHUP reload disabled: {e}");
            return;
        }
    };

    tokio::spawn(async move {
        while hangups.recv().await.is_some() {
            tracing::info!("SIGHUP received, reloading configuration");
            let reloaded = load_config(&args)
                .and_then(|config| gateway_config(&config))
                .and_then(|cfg| gateway.reload(&cfg));
            if let Err(e) = reloaded {
                tracing::error!("configuration reload failed: {e:#}");
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_on_hangup(_gateway: Arc<LmsSync>, _args: CliArgs) {}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    gateway_config(config)?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("Server config:");
    println!("{}", config.to_redacted_yaml(SENSITIVE_KEYS)?);

    Ok(())
}
