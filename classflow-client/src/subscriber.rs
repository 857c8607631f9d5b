//! Import client: submission and job watching
//!
//! `submit` posts the document with a byte-counting body so the caller gets
//! transport-level upload progress; `watch` follows the job's SSE stream,
//! reconciling snapshots until a terminal one is processed, reconnecting
//! with bounded backoff on transport drops.

use crate::error::ClientError;
use crate::progress::ProgressTracker;
use crate::sse::SseParser;
use classflow_common::{ImportScenario, JobSnapshot, SubmitResponse};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Outcome of one stream connection
enum StreamOutcome {
    /// A terminal snapshot was processed; the watcher is done
    Terminal,
    /// Transport dropped before a terminal snapshot
    Dropped(String),
}

/// Client for the import service
#[derive(Clone)]
pub struct ImportClient {
    http: reqwest::Client,
    base_url: String,
    max_reconnects: u32,
    reconnect_backoff: Duration,
}

impl ImportClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            max_reconnects: 5,
            reconnect_backoff: Duration::from_millis(500),
        }
    }

    /// Override reconnect behavior (attempts, initial backoff)
    pub fn with_reconnects(mut self, max_reconnects: u32, backoff: Duration) -> Self {
        self.max_reconnects = max_reconnects;
        self.reconnect_backoff = backoff;
        self
    }

    /// Submit a document for import
    ///
    /// `on_upload_progress` receives the byte-level percentage (0-100) as
    /// the body is handed to the transport. Returns the job id once the
    /// server has accepted the upload; a rejected submission surfaces
    /// synchronously and no job exists.
    pub async fn submit<F>(
        &self,
        data: Vec<u8>,
        filename: &str,
        scenario: &ImportScenario,
        mut on_upload_progress: F,
    ) -> Result<SubmitResponse, ClientError>
    where
        F: FnMut(u8) + Send + 'static,
    {
        let total = data.len().max(1);
        let body_stream = async_stream::stream! {
            let mut offset = 0usize;
            while offset < data.len() {
                let end = (offset + UPLOAD_CHUNK_BYTES).min(data.len());
                let chunk = data[offset..end].to_vec();
                offset = end;
                on_upload_progress((offset * 100 / total) as u8);
                yield Ok::<Vec<u8>, std::convert::Infallible>(chunk);
            }
        };

        let response = self
            .http
            .post(format!("{}/api/imports", self.base_url))
            .query(&[("filename", filename)])
            .query(scenario)
            .body(reqwest::Body::wrap_stream(body_stream))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::rejection(status.as_u16(), response).await);
        }

        let accepted: SubmitResponse = response.json().await?;
        info!(job_id = %accepted.job_id, filename, "import submitted");
        Ok(accepted)
    }

    /// Follow a job until it reaches a terminal state
    ///
    /// Calls `on_update` after every applied snapshot. Detaches from the
    /// stream immediately after processing a `finished == true` snapshot,
    /// so the terminal state is observed exactly once even if more events
    /// were to arrive. Transport drops before that are retried with
    /// doubling backoff up to the configured attempt limit; a transport error
    /// after the terminal snapshot cannot be observed at all (the
    /// connection is already gone).
    pub async fn watch<F>(
        &self,
        job_id: Uuid,
        mut on_update: F,
    ) -> Result<ProgressTracker, ClientError>
    where
        F: FnMut(&ProgressTracker),
    {
        let mut tracker = ProgressTracker::new();
        let mut backoff = self.reconnect_backoff;
        let mut attempts = 0u32;

        loop {
            match self.stream_once(job_id, &mut tracker, &mut on_update).await? {
                StreamOutcome::Terminal => return Ok(tracker),
                StreamOutcome::Dropped(reason) => {
                    // The job may have finished while we were away; the next
                    // connection replays the current snapshot, which alone
                    // reconstructs the full state.
                    if attempts >= self.max_reconnects {
                        return Err(ClientError::StreamEnded(reason));
                    }
                    attempts += 1;
                    warn!(
                        job_id = %job_id,
                        attempt = attempts,
                        reason = %reason,
                        "stream dropped, reconnecting"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    /// One SSE connection: read snapshots until terminal or drop
    async fn stream_once<F>(
        &self,
        job_id: Uuid,
        tracker: &mut ProgressTracker,
        on_update: &mut F,
    ) -> Result<StreamOutcome, ClientError>
    where
        F: FnMut(&ProgressTracker),
    {
        let response = match self
            .http
            .get(format!("{}/api/imports/{job_id}/events", self.base_url))
            .header("accept", "text/event-stream")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Ok(StreamOutcome::Dropped(e.to_string())),
        };

        let status = response.status();
        if status.as_u16() == 404 {
            // Unknown or evicted job: terminal, never a hang
            return Err(ClientError::JobNotFound(job_id));
        }
        if !status.is_success() {
            return Err(Self::rejection(status.as_u16(), response).await);
        }

        let mut parser = SseParser::new();
        let mut bytes = response.bytes_stream();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return Ok(StreamOutcome::Dropped(e.to_string())),
            };

            for message in parser.push(&chunk) {
                if let Some(event) = &message.event {
                    if event != "snapshot" {
                        continue;
                    }
                }
                let snapshot: JobSnapshot = serde_json::from_str(&message.data)
                    .map_err(|e| ClientError::Payload(e.to_string()))?;

                if tracker.apply(&snapshot) {
                    debug!(job_id = %job_id, seq = snapshot.seq, "snapshot applied");
                    on_update(tracker);
                }
                if tracker.finished() {
                    // Drop the connection without reading further
                    return Ok(StreamOutcome::Terminal);
                }
            }
        }

        Ok(StreamOutcome::Dropped(
            "server closed stream before terminal snapshot".to_string(),
        ))
    }

    /// Extract the error message from a rejection body
    async fn rejection(status: u16, response: reqwest::Response) -> ClientError {
        let message = match response.json::<serde_json::Value>().await {
            Ok(body) => body
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string(),
            Err(_) => "unknown error".to_string(),
        };
        ClientError::Rejected { status, message }
    }
}
