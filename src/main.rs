//! XMLA proxy entry point.

use std::net::SocketAddr;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use xmla_proxy::config::{Config, LogFormat};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
    }

    let state = match xmla_proxy::build_state(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "failed to build XMLA client");
            return ExitCode::FAILURE;
        }
    };

    let addr = match config.host.parse() {
        Ok(ip) => SocketAddr::new(ip, config.port),
        Err(e) => {
            tracing::error!(host = %config.host, error = %e, "invalid bind address");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        pretty_json = config.pretty_json,
        max_body_bytes = config.max_body_bytes,
        "XMLA proxy starting",
    );

    let app = xmla_proxy::router(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(%addr, "XMLA proxy ready");

    if let Err(e) = xmla_http::serve(listener, app, shutdown_signal()).await {
        tracing::error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("XMLA proxy shut down");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install signal handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
