//! Import submission and status endpoints
//!
//! POST /api/imports accepts the document upload, creates the job, and
//! spawns the pipeline; the job id is returned synchronously once the
//! upload has been accepted. A rejected submission (empty or oversized
//! payload) never creates a job. GET /api/imports/:job_id serves the
//! current snapshot as a poll fallback.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    runner::ImportRequest,
    AppState,
};
use classflow_common::{ImportScenario, JobSnapshot, SubmitResponse};

/// Query parameters accompanying a submission
#[derive(Debug, serde::Deserialize)]
pub struct SubmitParams {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(flatten)]
    pub scenario: ImportScenario,
}

/// POST /api/imports
///
/// Accept an uploaded document and start the import pipeline.
/// Returns 202 Accepted with the job id.
pub async fn submit_import(
    State(state): State<AppState>,
    Query(params): Query<SubmitParams>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("upload body is empty".to_string()));
    }
    if body.len() > state.config.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "upload is {} bytes, limit is {}",
            body.len(),
            state.config.max_upload_bytes
        )));
    }

    let filename = params
        .filename
        .unwrap_or_else(|| "document".to_string());
    let snapshot = state.registry.create().await;
    let job_id = snapshot.job_id;

    tracing::info!(
        job_id = %job_id,
        filename = %filename,
        size = body.len(),
        "import submitted"
    );

    let request = ImportRequest {
        data: body.to_vec(),
        filename,
        scenario: params.scenario,
    };

    // Pipeline runs in the background; subscribers follow it over SSE.
    let runner = state.runner.clone();
    let last_error = state.last_error.clone();
    tokio::spawn(async move {
        if let Err(e) = runner.run(job_id, request).await {
            *last_error.write().await = Some(e.to_string());
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            job_id,
            created_at: snapshot.created_at,
        }),
    ))
}

/// GET /api/imports/:job_id
///
/// Current snapshot of a job. 404 for unknown or evicted ids.
pub async fn get_import_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobSnapshot>> {
    let snapshot = state.registry.snapshot(job_id).await?;
    tracing::debug!(job_id = %job_id, seq = snapshot.seq, "status query");
    Ok(Json(snapshot))
}

/// Build import routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/api/imports", post(submit_import))
        .route("/api/imports/:job_id", get(get_import_status))
}
