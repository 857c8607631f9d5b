//! classflow-import - Import Pipeline Service
//!
//! Runs the asynchronous document-import pipeline for ClassFlow and streams
//! per-job progress to subscribers over SSE.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use classflow_import::collaborators::Collaborators;
use classflow_import::config::{CliArgs, ImportConfig};
use classflow_import::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting classflow-import service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = CliArgs::parse();
    let config = ImportConfig::resolve(&args)?;

    // The real collaborators (file storage, extractor, AI parser, entity
    // writers) are separate services; outside a full deployment the local
    // stand-ins keep the pipeline runnable end to end.
    let collaborators = Collaborators::local(config.spool_dir.clone());

    let state = AppState::new(config.clone(), collaborators);
    state
        .registry
        .clone()
        .spawn_eviction(config.retention);

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
