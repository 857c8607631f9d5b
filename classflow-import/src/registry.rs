//! Job registry
//!
//! Process-wide store of job records, constructed once at startup and
//! injected through `AppState` (no ambient global). The runner is the sole
//! writer per job; stream handlers and status queries read snapshots.
//! Every successful mutation bumps the record's sequence number and emits
//! the new snapshot on the bus.

use crate::models::JobRecord;
use chrono::{Duration as ChronoDuration, Utc};
use classflow_common::{Error, JobSnapshot, SnapshotBus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Registry-level errors
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Unknown or already-evicted job id; terminal and non-retryable
    #[error("job not found: {0}")]
    NotFound(Uuid),

    /// A mutator rejected the requested state change
    #[error(transparent)]
    Invalid(#[from] Error),
}

/// In-memory store of import jobs
pub struct JobRegistry {
    jobs: RwLock<HashMap<Uuid, JobRecord>>,
    bus: SnapshotBus,
}

impl JobRegistry {
    pub fn new(bus: SnapshotBus) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            bus,
        }
    }

    /// Bus carrying this registry's snapshots
    pub fn bus(&self) -> &SnapshotBus {
        &self.bus
    }

    /// Create a fresh job and publish its initial snapshot
    pub async fn create(&self) -> JobSnapshot {
        let job_id = Uuid::new_v4();
        let record = JobRecord::new(job_id);
        let snapshot = record.snapshot();

        self.jobs.write().await.insert(job_id, record);
        info!(job_id = %job_id, "import job created");

        self.bus.emit(snapshot.clone());
        snapshot
    }

    /// Current snapshot of a job
    pub async fn snapshot(&self, job_id: Uuid) -> Result<JobSnapshot, RegistryError> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .map(JobRecord::snapshot)
            .ok_or(RegistryError::NotFound(job_id))
    }

    /// Apply a mutation atomically, then publish the resulting snapshot
    ///
    /// The sequence bump and the emit happen only if the mutator succeeds,
    /// so subscribers never see a half-applied or rolled-back change.
    pub async fn update<F>(&self, job_id: Uuid, mutator: F) -> Result<JobSnapshot, RegistryError>
    where
        F: FnOnce(&mut JobRecord) -> Result<(), Error>,
    {
        let snapshot = {
            let mut jobs = self.jobs.write().await;
            let record = jobs
                .get_mut(&job_id)
                .ok_or(RegistryError::NotFound(job_id))?;
            mutator(record)?;
            record.touch();
            record.snapshot()
        };

        self.bus.emit(snapshot.clone());
        Ok(snapshot)
    }

    /// Remove finished jobs whose last update is older than `retention`
    ///
    /// Returns the number of evicted jobs. Live jobs are never evicted.
    pub async fn evict_finished(&self, retention: Duration) -> usize {
        let cutoff = Utc::now()
            - ChronoDuration::from_std(retention).unwrap_or_else(|_| ChronoDuration::seconds(0));

        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|job_id, record| {
            let keep = !record.finished() || record.snapshot().updated_at > cutoff;
            if !keep {
                debug!(job_id = %job_id, "evicting finished import job");
            }
            keep
        });
        before - jobs.len()
    }

    /// Background sweep evicting terminal jobs past the retention window
    pub fn spawn_eviction(self: Arc<Self>, retention: Duration) -> tokio::task::JoinHandle<()> {
        let sweep_every = (retention / 4).max(Duration::from_secs(5));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = self.evict_finished(retention).await;
                if evicted > 0 {
                    info!(evicted, "evicted finished import jobs");
                }
            }
        })
    }

    /// Number of jobs currently held (diagnostics)
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}
