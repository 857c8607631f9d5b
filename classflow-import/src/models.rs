//! Import job record and its mutation rules
//!
//! The record is the single source of truth for one job. Only the pipeline
//! runner mutates it (through the registry), and every mutator enforces the
//! job-level invariants:
//!
//! - at most one step is `active` at a time while the job is live
//! - step statuses only advance (`pending → active → done | error`)
//! - `error` and `result` are mutually exclusive
//! - `finished` is true exactly when all steps are done or one step errored

use chrono::{DateTime, Utc};
use classflow_common::{Error, ImportOutcome, JobSnapshot, StepKey, StepState, StepStatus};
use uuid::Uuid;

/// Mutable state of one import job
#[derive(Debug, Clone)]
pub struct JobRecord {
    job_id: Uuid,
    seq: u64,
    statuses: [StepStatus; StepKey::COUNT],
    error: Option<String>,
    result: Option<ImportOutcome>,
    finished: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Fresh record: every step pending, sequence zero
    pub fn new(job_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            seq: 0,
            statuses: [StepStatus::Pending; StepKey::COUNT],
            error: None,
            result: None,
            finished: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn status_of(&self, key: StepKey) -> StepStatus {
        self.statuses[key.index()]
    }

    /// Mark step `key` as executing
    ///
    /// Rejects the transition if the job already terminated, another step is
    /// still active, or the step is past `pending`.
    pub fn begin_step(&mut self, key: StepKey) -> Result<(), Error> {
        if self.finished {
            return Err(Error::InvalidTransition(format!(
                "job {} is finished, cannot begin step {key}",
                self.job_id
            )));
        }
        if let Some(active) = self.active_step() {
            return Err(Error::InvalidTransition(format!(
                "step {active} is still active, cannot begin {key}"
            )));
        }
        self.transition(key, StepStatus::Active)
    }

    /// Mark the active step `key` as completed
    pub fn complete_step(&mut self, key: StepKey) -> Result<(), Error> {
        self.transition(key, StepStatus::Done)
    }

    /// Mark the active step `key` as failed and terminate the job
    ///
    /// Later steps stay `pending`; the job is abandoned at first failure.
    pub fn fail_step(&mut self, key: StepKey, message: impl Into<String>) -> Result<(), Error> {
        self.transition(key, StepStatus::Error)?;
        self.error = Some(message.into());
        self.finished = true;
        Ok(())
    }

    /// Complete the trailing bookkeeping step and terminate in success
    ///
    /// Refused unless every earlier step is already done, keeping
    /// `finished` equivalent to "all steps done" on the success path.
    pub fn finish(&mut self, outcome: ImportOutcome) -> Result<(), Error> {
        if StepKey::ALL
            .into_iter()
            .filter(|k| *k != StepKey::Finish)
            .any(|k| self.statuses[k.index()] != StepStatus::Done)
        {
            return Err(Error::InvalidTransition(
                "cannot finish: earlier steps incomplete".to_string(),
            ));
        }
        self.transition(StepKey::Finish, StepStatus::Done)?;
        self.result = Some(outcome);
        self.finished = true;
        Ok(())
    }

    /// Currently executing step, if any
    pub fn active_step(&self) -> Option<StepKey> {
        StepKey::ALL
            .into_iter()
            .find(|k| self.statuses[k.index()] == StepStatus::Active)
    }

    /// Bump the sequence number and refresh `updated_at`
    ///
    /// Called by the registry once per successful mutation, so snapshots of
    /// a job are totally ordered by `seq`.
    pub fn touch(&mut self) {
        self.seq += 1;
        self.updated_at = Utc::now();
    }

    /// Full immutable copy for publication
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.job_id,
            seq: self.seq,
            steps: StepKey::ALL
                .iter()
                .map(|&key| StepState {
                    key,
                    status: self.statuses[key.index()],
                })
                .collect(),
            error: self.error.clone(),
            result: self.result.clone(),
            finished: self.finished,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn transition(&mut self, key: StepKey, next: StepStatus) -> Result<(), Error> {
        let current = self.statuses[key.index()];
        if !current.can_transition_to(next) {
            return Err(Error::InvalidTransition(format!(
                "step {key}: {current:?} -> {next:?} is not allowed"
            )));
        }
        self.statuses[key.index()] = next;
        Ok(())
    }
}
