//! walrus-portal: a read-only HTTP gateway for Walrus Sites.
//!
//! Each request's host name is translated into a Sui object id, the
//! matching resource descriptor is fetched from the site object's dynamic
//! fields, the content blob is pulled from a Walrus aggregator, verified
//! against its on-chain hash, and served with the stored headers.
//!
//! The HTTP layer here is deliberately thin; the pipeline lives in the
//! `portal-core` workspace crate.
//!
//! ## Example Usage
//!
//! ```bash
//! # Serve mainnet sites with the default configuration
//! walrus-portal --listen 0.0.0.0:3000
//!
//! # Serve with a config file and verbose tracing
//! walrus-portal --config portal.json -v
//!
//! # JSON logs for a log collector
//! walrus-portal --json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::HOST;
use axum::response::Response;
use axum::Router;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use portal_core::{PortalConfig, PortalService};
use portal_types::PortalResponse;

#[derive(Parser)]
#[command(
    name = "walrus-portal",
    author,
    version,
    about = "Read-only HTTP gateway serving Walrus Sites from Sui object state"
)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Bind address, overriding the configured listen address
    #[arg(long)]
    listen: Option<String>,

    /// Emit logs as JSON lines instead of human-readable text
    #[arg(long)]
    json: bool,

    /// Verbose output (debug-level tracing)
    #[arg(long, short)]
    verbose: bool,
}

fn init_tracing(json: bool, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json, cli.verbose);

    let mut config = match &cli.config {
        Some(path) => PortalConfig::load(path)?,
        None => {
            let mut config = PortalConfig::default();
            config.apply_env_overrides();
            config
        }
    };
    if let Some(listen) = cli.listen {
        config.listen_address = listen;
    }

    let listen_address = config.listen_address.clone();
    let service = Arc::new(PortalService::from_config(&config).context("build portal service")?);

    let app = Router::new().fallback(handle).with_state(service);
    let listener = tokio::net::TcpListener::bind(&listen_address)
        .await
        .with_context(|| format!("bind {listen_address}"))?;
    info!(address = %listen_address, network = ?config.network, "walrus-portal listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;
    Ok(())
}

async fn handle(State(service): State<Arc<PortalService>>, request: Request) -> Response {
    if !matches!(
        request.method().as_str(),
        "GET" | "HEAD"
    ) {
        return into_axum(PortalResponse::new(405));
    }

    let host = request
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let path = request.uri().path().to_string();

    let response = service.handle_request(&host, &path).await;
    into_axum(response)
}

fn into_axum(response: PortalResponse) -> Response {
    let mut builder = axum::http::Response::builder().status(response.status);
    for (name, value) in &response.headers {
        builder = builder.header(name, value);
    }
    match builder.body(Body::from(response.body)) {
        Ok(response) => response,
        Err(error) => {
            warn!(error = %error, "failed to materialize response");
            axum::http::Response::builder()
                .status(500)
                .body(Body::empty())
                .expect("empty 500 response")
        }
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(error = %error, "failed to install ctrl-c handler");
    } else {
        info!("shutdown signal received");
    }
}
