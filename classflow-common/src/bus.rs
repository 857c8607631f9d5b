//! In-process snapshot fan-out
//!
//! One `SnapshotBus` per process carries every job's snapshots; SSE stream
//! handlers subscribe and filter for their job id. Built on
//! `tokio::sync::broadcast`, so each subscriber gets its own copy of every
//! snapshot emitted after it subscribed.

use crate::snapshot::JobSnapshot;
use tokio::sync::broadcast;
use tracing::debug;

/// Broadcast bus for job snapshots
#[derive(Clone)]
pub struct SnapshotBus {
    tx: broadcast::Sender<JobSnapshot>,
    capacity: usize,
}

impl SnapshotBus {
    /// Create a bus with the given channel capacity
    ///
    /// When the channel is full the oldest snapshots are dropped for lagging
    /// receivers; that is safe here because every snapshot is a full copy of
    /// the job, so a receiver that skips ahead still reconstructs correct
    /// state from the next one it sees.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Emit a snapshot to all current subscribers
    ///
    /// Returns the number of receivers that will observe it. Zero receivers
    /// is normal (nobody is watching this job yet).
    pub fn emit(&self, snapshot: JobSnapshot) -> usize {
        match self.tx.send(snapshot) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("snapshot bus: no receivers");
                0
            }
        }
    }

    /// Subscribe to all future snapshots
    pub fn subscribe(&self) -> broadcast::Receiver<JobSnapshot> {
        self.tx.subscribe()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::{StepKey, StepStatus};
    use crate::snapshot::StepState;
    use chrono::Utc;
    use uuid::Uuid;

    fn snapshot(seq: u64) -> JobSnapshot {
        JobSnapshot {
            job_id: Uuid::new_v4(),
            seq,
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

    #[tokio::test]
    async fn subscribers_receive_emitted_snapshots() {
        let bus = SnapshotBus::new(16);
        let mut rx_a = bus.subscribe();
        let mut rx_b = bus.subscribe();

        assert_eq!(bus.emit(snapshot(1)), 2);

        assert_eq!(rx_a.recv().await.unwrap().seq, 1);
        assert_eq!(rx_b.recv().await.unwrap().seq, 1);
    }

    #[tokio::test]
    async fn emit_without_subscribers_is_harmless() {
        let bus = SnapshotBus::new(16);
        assert_eq!(bus.emit(snapshot(1)), 0);
    }

    #[tokio::test]
    async fn detaching_one_subscriber_does_not_affect_others() {
        let bus = SnapshotBus::new(16);
        let rx_gone = bus.subscribe();
        let mut rx_stays = bus.subscribe();
        drop(rx_gone);

        bus.emit(snapshot(7));
        assert_eq!(rx_stays.recv().await.unwrap().seq, 7);
    }
}
