//! Shared API request/response types
//!
//! Types that cross the HTTP boundary between the import service and its
//! clients, beyond the snapshot stream itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller-supplied context accompanying a submission, forwarded to the AI
/// parsing step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportScenario {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<String>,
}

/// POST /api/imports response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub created_at: DateTime<Utc>,
}
