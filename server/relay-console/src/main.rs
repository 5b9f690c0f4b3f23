use clap::Parser;
use colored::*;
use std::net::SocketAddr;
use tracing::{info, warn};

use config_engine::ConfigEngine;
use error_common::{log_error, RelayError, Result};
use logger_redacted::init_tracing;
use relay_console::{create_app, ConsoleServer};

/// Relay Console admin API server
#[derive(Parser, Debug)]
#[command(name = "relay-console")]
#[command(about = "Multi-tenant support desk admin API with a tamper-evident audit trail")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "RELAY_CONFIG", default_value = config_engine::DEFAULT_CONFIG_FILE)]
    config: String,

    /// Server bind address, overrides `server.host`
    #[arg(long)]
    host: Option<String>,

    /// Server port, overrides `server.port`
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = ConfigEngine::new()
        .with_file(&args.config)
        .load_with_dotenv()
        .map_err(|e| RelayError::ConfigError(e.to_string()))?;

    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if args.verbose {
        settings.logging.level = "debug".to_string();
    }
    settings
        .validate()
        .map_err(|e| RelayError::ConfigError(e.to_string()))?;

    init_tracing(&settings.logging).map_err(|e| RelayError::InternalError(e.to_string()))?;

    info!("{}", "Starting Relay Console".bright_cyan());
    info!("Version: {}", env!("CARGO_PKG_VERSION").bright_white());
    info!("Configuration: {}", args.config.bright_white());

    if settings.auth.tokens.is_empty() {
        warn!("No api_access_token configured; every authenticated route will answer 401");
    }
    if !settings.audit.enabled {
        warn!("{}", "Audit trail is disabled; mutations will not be recorded".bright_yellow());
    }

    let bind_address = settings.server.bind_address();
    let server = ConsoleServer::from_settings(settings).await.map_err(|e| {
        let error = RelayError::AuditError(e.to_string());
        log_error("audit store initialisation", &error);
        error
    })?;

    let app = create_app(server);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| RelayError::NetworkError(format!("Failed to bind to {bind_address}: {e}")))?;

    info!("{}", format!("Relay Console running on http://{bind_address}").bright_green());
    info!("{}", format!("Health check available at: http://{bind_address}/health").bright_blue());
    info!("{}", format!("OpenAPI document at: http://{bind_address}/api-docs/openapi.json").bright_blue());

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| RelayError::ServerError(format!("HTTP server error: {e}")))?;

    info!("Relay Console stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
