//! classflow-import library interface
//!
//! Exposes the application state and router for the binary and for
//! integration tests.

pub mod api;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod runner;

pub use crate::error::{ApiError, ApiResult};

use crate::collaborators::Collaborators;
use crate::config::ImportConfig;
use crate::registry::JobRegistry;
use crate::runner::PipelineRunner;
use axum::Router;
use chrono::{DateTime, Utc};
use classflow_common::SnapshotBus;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Job registry, sole holder of job records
    pub registry: Arc<JobRegistry>,
    /// Pipeline executor spawned per submission
    pub runner: PipelineRunner,
    /// Resolved service configuration
    pub config: ImportConfig,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last pipeline error for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(config: ImportConfig, collaborators: Collaborators) -> Self {
        let bus = SnapshotBus::new(config.bus_capacity);
        let registry = Arc::new(JobRegistry::new(bus));
        let runner = PipelineRunner::new(registry.clone(), collaborators, config.step_timeout);
        Self {
            registry,
            runner,
            config,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::import_routes())
        .route("/api/imports/:job_id/events", get(api::job_event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
