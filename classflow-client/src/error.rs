//! Client error types

use thiserror::Error;

/// Errors surfaced by the import client
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connect, read, TLS)
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server refused the request (4xx/5xx with an error body)
    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Unknown or evicted job id; terminal, not worth retrying
    #[error("import job not found: {0}")]
    JobNotFound(uuid::Uuid),

    /// Malformed stream payload
    #[error("invalid stream payload: {0}")]
    Payload(String),

    /// Stream dropped before a terminal snapshot and reconnects ran out
    #[error("stream ended without a terminal snapshot: {0}")]
    StreamEnded(String),
}
