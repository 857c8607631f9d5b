//! Job snapshot wire types
//!
//! A snapshot is a full copy of one job's state, pushed to every subscriber
//! on every mutation. Pushing the whole record rather than a diff keeps the
//! subscriber stateless: any single snapshot fully reconstructs the job, so
//! a reconnecting client resumes from whatever it receives next.

use crate::steps::{StepKey, StepStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One step's state as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepState {
    pub key: StepKey,
    pub status: StepStatus,
}

/// Result payload populated on terminal success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    /// Created study plan id
    pub study_plan_id: Uuid,
    /// Created curriculum plan (KTP) id
    pub curriculum_plan_id: Uuid,
    /// Total lessons created
    pub lesson_count: usize,
}

/// Full snapshot of one import job
///
/// `seq` totally orders the snapshots of a job; stream handlers drop
/// anything at or below the last sequence they delivered, so no subscriber
/// can observe transitions out of order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub job_id: Uuid,
    /// Per-job monotonic sequence number, bumped on every mutation
    pub seq: u64,
    /// Steps in canonical order (`StepKey::ALL`)
    pub steps: Vec<StepState>,
    /// Failure message; set exactly when the job terminated in error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Success payload; set exactly when all steps completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ImportOutcome>,
    /// True once the job reached terminal success or terminal failure
    pub finished: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobSnapshot {
    /// Look up a step's status, defaulting to `Pending` for absent keys
    pub fn status_of(&self, key: StepKey) -> StepStatus {
        self.steps
            .iter()
            .find(|s| s.key == key)
            .map(|s| s.status)
            .unwrap_or_default()
    }

    /// Steps completed, excluding the trailing bookkeeping step
    pub fn done_steps_excluding_finish(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.key != StepKey::Finish && s.status == StepStatus::Done)
            .count()
    }

    /// Whether the job terminated in failure
    pub fn is_failed(&self) -> bool {
        self.finished && self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> JobSnapshot {
        JobSnapshot {
            job_id: Uuid::new_v4(),
            seq: 3,
            steps: StepKey::ALL
                .iter()
                .map(|&key| StepState {
                    key,
                    status: StepStatus::Pending,
                })
                .collect(),
            error: None,
            result: None,
            finished: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn wire_shape_uses_camel_case_and_omits_absent_fields() {
        let snapshot = sample();
        let json = serde_json::to_value(&snapshot).unwrap();

        assert!(json.get("jobId").is_some());
        assert!(json.get("finished").is_some());
        assert!(json.get("createdAt").is_some());
        // error/result absent until set
        assert!(json.get("error").is_none());
        assert!(json.get("result").is_none());

        let steps = json["steps"].as_array().unwrap();
        assert_eq!(steps.len(), StepKey::COUNT);
        assert_eq!(steps[0]["key"], "upload");
        assert_eq!(steps[0]["status"], "pending");
    }

    #[test]
    fn status_of_defaults_missing_keys_to_pending() {
        let mut snapshot = sample();
        snapshot.steps.retain(|s| s.key != StepKey::Lessons);
        assert_eq!(snapshot.status_of(StepKey::Lessons), StepStatus::Pending);
    }

    #[test]
    fn done_count_excludes_finish() {
        let mut snapshot = sample();
        for step in &mut snapshot.steps {
            step.status = StepStatus::Done;
        }
        assert_eq!(snapshot.done_steps_excluding_finish(), StepKey::COUNT - 1);
    }

    #[test]
    fn outcome_round_trips() {
        let outcome = ImportOutcome {
            study_plan_id: Uuid::new_v4(),
            curriculum_plan_id: Uuid::new_v4(),
            lesson_count: 34,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("studyPlanId").is_some());
        assert!(json.get("lessonCount").is_some());
        let back: ImportOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, outcome);
    }
}
