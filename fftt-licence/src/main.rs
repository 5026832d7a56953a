//! fftt-licence - FFTT licence lookup proxy
//!
//! Signs each lookup with the federation's timestamp/HMAC scheme, calls the
//! registry XML API and answers with JSON. Also serves a small lookup page.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fftt_common::config::{load_toml_config, CliOverrides, ProxyConfig, TomlConfig};
use fftt_common::{RegistryClient, SessionId};
use fftt_licence::{build_router, AppState};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for fftt-licence
///
/// `BASE_URL`, `APP_ID` and `MOT_DE_PASSE` are read from the environment
/// when the matching flag is absent.
#[derive(Parser, Debug)]
#[command(name = "fftt-licence")]
#[command(about = "FFTT licence lookup proxy")]
#[command(version)]
struct Args {
    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Registry base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Application identifier issued by the federation
    #[arg(long)]
    app_id: Option<String>,

    /// Registry password
    #[arg(long)]
    password: Option<String>,

    /// Registry script serving licence lookups
    #[arg(long)]
    endpoint: Option<String>,

    /// Outbound request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Address to listen on
    #[arg(short, long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            base_url: self.base_url.clone(),
            app_id: self.app_id.clone(),
            password: self.password.clone(),
            licence_endpoint: self.endpoint.clone(),
            timeout_secs: self.timeout_secs,
            bind: self.bind.clone(),
            port: self.port,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = match &args.config {
        Some(path) => load_toml_config(path)?,
        None => TomlConfig::default(),
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "fftt_licence={level},fftt_common={level},tower_http={level}",
                    level = toml_config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any configuration errors
    info!(
        "Starting FFTT licence proxy (fftt-licence) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = ProxyConfig::resolve(&args.overrides(), &toml_config)
        .context("Invalid configuration, refusing to start")?;

    let session = SessionId::generate();
    info!("Registry base URL: {}", config.registry.base_url);
    info!("Application id: {}", config.registry.app_id);
    info!(
        "Licence endpoint: {} (timeout {:?})",
        config.registry.licence_endpoint, config.registry.timeout
    );
    info!("Session serie: {}", session);

    let registry = RegistryClient::new(&config.registry, session)
        .context("Failed to initialize registry client")?;

    let app = build_router(AppState::new(registry));

    let addr = config
        .server
        .socket_addr()
        .context("Invalid listen address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("fftt-licence listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
