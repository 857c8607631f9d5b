//! Snapshot reconciliation
//!
//! Turns the two progress sources — the transport's byte-level upload
//! percentage and the server's snapshot stream — into one canonical step
//! list, a coarse phase, and a single percentage.
//!
//! The step order is `StepKey::ALL`, fixed at construction; the order keys
//! appear in a snapshot payload is irrelevant and absent keys count as
//! pending. Because every snapshot is a full copy of the job, applying any
//! single snapshot fully reconstructs the state: a subscriber that missed
//! events reconciles correctly from whatever arrives next, and replaying a
//! snapshot is a no-op.

use classflow_common::{ImportOutcome, JobSnapshot, StepKey, StepStatus};

/// Coarse client-side view of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Upload in flight, no snapshot received yet
    Upload,
    /// Snapshots arriving, job not finished
    Processing,
    /// Terminal success
    Done,
    /// Terminal failure
    Error,
}

/// One step as presented to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepView {
    pub key: StepKey,
    pub label: &'static str,
    pub status: StepStatus,
}

/// Reconciles snapshots into phase / percent / step list
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    upload_percent: u8,
    statuses: [StepStatus; StepKey::COUNT],
    last_seq: Option<u64>,
    error: Option<String>,
    result: Option<ImportOutcome>,
    finished: bool,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            upload_percent: 0,
            statuses: [StepStatus::Pending; StepKey::COUNT],
            last_seq: None,
            error: None,
            result: None,
            finished: false,
        }
    }

    /// Record the transport's byte-level upload percentage (0-100)
    ///
    /// Only visible while no snapshot has arrived; afterwards percent is
    /// derived from step completion.
    pub fn set_upload_percent(&mut self, percent: u8) {
        self.upload_percent = percent.min(100);
    }

    /// Apply one snapshot; returns false for stale replays (no-op)
    ///
    /// Staleness is judged by the snapshot's sequence number, so a
    /// reconnect that replays the latest state changes nothing.
    pub fn apply(&mut self, snapshot: &JobSnapshot) -> bool {
        if let Some(last) = self.last_seq {
            if snapshot.seq <= last {
                return false;
            }
        }
        self.last_seq = Some(snapshot.seq);

        for key in StepKey::ALL {
            // Absent keys default to pending
            self.statuses[key.index()] = snapshot.status_of(key);
        }
        self.error = snapshot.error.clone();
        self.result = snapshot.result.clone();
        self.finished = snapshot.finished;
        true
    }

    pub fn phase(&self) -> Phase {
        if self.finished {
            if self.error.is_some() {
                Phase::Error
            } else {
                Phase::Done
            }
        } else if self.last_seq.is_some() {
            Phase::Processing
        } else {
            Phase::Upload
        }
    }

    /// Single overall percentage (0-100)
    ///
    /// Upload phase reports the raw byte percentage. Once snapshots drive
    /// the number, completion of everything but the trailing bookkeeping
    /// step maps to 99, never 100, until the terminal snapshot arrives; the
    /// floor of 5 avoids a stuck 0 right after the upload finishes.
    pub fn percent(&self) -> u8 {
        match self.phase() {
            Phase::Upload => self.upload_percent,
            Phase::Done => 100,
            Phase::Processing | Phase::Error => {
                let done = StepKey::ALL
                    .iter()
                    .filter(|&&key| {
                        key != StepKey::Finish
                            && self.statuses[key.index()] == StepStatus::Done
                    })
                    .count();
                let raw = (done as f64 * 100.0 / (StepKey::COUNT - 1) as f64).round() as u8;
                raw.clamp(5, 99)
            }
        }
    }

    /// Steps in canonical order with static labels
    pub fn steps(&self) -> Vec<StepView> {
        StepKey::ALL
            .iter()
            .map(|&key| StepView {
                key,
                label: key.label(),
                status: self.statuses[key.index()],
            })
            .collect()
    }

    pub fn status_of(&self, key: StepKey) -> StepStatus {
        self.statuses[key.index()]
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result(&self) -> Option<&ImportOutcome> {
        self.result.as_ref()
    }

    /// True once a terminal snapshot has been processed
    pub fn finished(&self) -> bool {
        self.finished
    }
}
