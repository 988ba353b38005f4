//! Hooktrigger web server.
//!
//! Receives GitHub webhooks, matches them against the configured trigger
//! rules and posts to Jenkins.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hooktrigger::deliver::build_client;
use hooktrigger::{build_router, AppState, Config};

#[derive(Parser)]
#[command(
    name = "hooktrigger",
    version,
    about = "GitHub webhook to Jenkins trigger",
    disable_version_flag = true
)]
struct Cli {
    /// Print the version and exit.
    #[arg(short = 'v', short_alias = 'V', long, action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the webhook server.
    Start {
        /// Path to the JSON configuration document.
        #[arg(short, long, env = "HOOKTRIGGER_CONFIG")]
        config: PathBuf,
    },
    /// Print the version and exit.
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Version => {
            println!("hooktrigger {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Start { config } => {
            init_tracing();
            serve(config).await
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();
}

async fn serve(config_path: PathBuf) -> Result<()> {
    info!(config = %config_path.display(), "web_server_starting");

    let config = Config::load(&config_path)?;
    info!(
        version = ?config.version,
        port = config.port,
        jenkins_url = %config.jenkins.base_url,
        rules = config.rules.len(),
        endpoints = config.endpoints.len(),
        rejected_endpoints = config.rejected_endpoints.len(),
        forward_targets = config.forward.len(),
        failure_policy = ?config.failure_policy,
        "config_loaded"
    );

    if config.secret.is_none() {
        warn!("signature_verification_disabled");
    }

    let client =
        build_client(config.jenkins.timeout).context("Failed to build HTTP client")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = build_router(AppState::new(config, client));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!(address = %addr, "web_server_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "sigint_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
