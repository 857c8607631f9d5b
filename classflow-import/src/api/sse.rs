//! Per-job SSE stream
//!
//! GET /api/imports/:job_id/events
//!
//! Contract: the connecting subscriber first receives the job's current
//! snapshot whatever its state, then every later snapshot in sequence
//! order, and the server closes the stream right after a terminal snapshot
//! (`finished == true`) has been sent. Unknown job ids are refused with 404
//! before any stream is opened, so an observer never hangs on a nonexistent
//! job.

use crate::error::ApiResult;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use classflow_common::JobSnapshot;
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

fn snapshot_event(snapshot: &JobSnapshot) -> Option<Event> {
    match serde_json::to_string(snapshot) {
        Ok(json) => Some(Event::default().event("snapshot").data(json)),
        Err(e) => {
            warn!(job_id = %snapshot.job_id, error = %e, "failed to serialize snapshot");
            None
        }
    }
}

/// GET /api/imports/:job_id/events - SSE stream of job snapshots
pub async fn job_event_stream(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    // Subscribe before reading the initial snapshot so nothing emitted in
    // between is lost; older duplicates are dropped by the seq filter below.
    let mut rx = state.registry.bus().subscribe();
    let initial = state.registry.snapshot(job_id).await?;

    info!(job_id = %job_id, seq = initial.seq, "SSE subscriber connected");
    let registry = state.registry.clone();

    let stream = async_stream::stream! {
        let mut last_seq = initial.seq;
        let terminal = initial.finished;
        if let Some(event) = snapshot_event(&initial) {
            yield Ok(event);
        }
        if terminal {
            info!(job_id = %job_id, "initial snapshot already terminal, closing stream");
            return;
        }

        loop {
            tokio::select! {
                // Heartbeat every 15 seconds
                _ = tokio::time::sleep(Duration::from_secs(15)) => {
                    debug!(job_id = %job_id, "SSE heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                result = rx.recv() => match result {
                    Ok(snapshot) => {
                        if snapshot.job_id != job_id || snapshot.seq <= last_seq {
                            continue;
                        }
                        last_seq = snapshot.seq;
                        let finished = snapshot.finished;
                        if let Some(event) = snapshot_event(&snapshot) {
                            yield Ok(event);
                        }
                        if finished {
                            info!(job_id = %job_id, "terminal snapshot sent, closing stream");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // Missed intermediates are harmless: snapshots are
                        // full copies, so resync from the registry.
                        debug!(job_id = %job_id, skipped, "SSE receiver lagged, resyncing");
                        match registry.snapshot(job_id).await {
                            Ok(snapshot) if snapshot.seq > last_seq => {
                                last_seq = snapshot.seq;
                                let finished = snapshot.finished;
                                if let Some(event) = snapshot_event(&snapshot) {
                                    yield Ok(event);
                                }
                                if finished {
                                    break;
                                }
                            }
                            Ok(_) => {}
                            Err(_) => {
                                warn!(job_id = %job_id, "job evicted mid-stream, closing");
                                break;
                            }
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}
