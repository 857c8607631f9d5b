//! End-to-end subscriber tests against a live import service

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use classflow_client::{ClientError, ImportClient, Phase};
use classflow_common::{Error, ImportScenario, StepKey, StepStatus};
use classflow_import::collaborators::{
    Collaborators, CurriculumParser, ParsedCurriculum,
};
use classflow_import::config::ImportConfig;
use classflow_import::{build_router, AppState};

const SAMPLE_DOC: &[u8] = b"Algebra I\nLinear equations\nQuadratic equations";

/// Serve the import service on an ephemeral port
async fn spawn_service(collaborators: Collaborators) -> (SocketAddr, AppState) {
    let config = ImportConfig::default();
    let state = AppState::new(config, collaborators);
    let app = build_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn local_collaborators(spool: &tempfile::TempDir) -> Collaborators {
    Collaborators::local(spool.path().to_path_buf())
}

/// AI parser stand-in that always fails
struct BrokenParser;

#[async_trait]
impl CurriculumParser for BrokenParser {
    async fn parse(
        &self,
        _text: &str,
        _scenario: &ImportScenario,
    ) -> Result<ParsedCurriculum, Error> {
        Err(Error::Internal("model unavailable".to_string()))
    }
}

#[tokio::test]
async fn submit_reports_upload_progress_and_watch_reaches_done() {
    let spool = tempfile::tempdir().unwrap();
    let (addr, _state) = spawn_service(local_collaborators(&spool)).await;
    let client = ImportClient::new(format!("http://{addr}"));

    let last_upload = Arc::new(AtomicU8::new(0));
    let upload_seen = last_upload.clone();
    let accepted = client
        .submit(
            SAMPLE_DOC.to_vec(),
            "plan.txt",
            &ImportScenario {
                subject: Some("Mathematics".to_string()),
                ..ImportScenario::default()
            },
            move |percent| upload_seen.store(percent, Ordering::SeqCst),
        )
        .await
        .unwrap();
    assert_eq!(last_upload.load(Ordering::SeqCst), 100);

    let updates = Arc::new(AtomicUsize::new(0));
    let update_count = updates.clone();
    let tracker = client
        .watch(accepted.job_id, move |_| {
            update_count.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

    assert_eq!(tracker.phase(), Phase::Done);
    assert_eq!(tracker.percent(), 100);
    assert_eq!(tracker.result().unwrap().lesson_count, 2);
    assert!(tracker
        .steps()
        .iter()
        .all(|s| s.status == StepStatus::Done));
    assert!(updates.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn failed_step_surfaces_error_phase_to_the_watcher() {
    let spool = tempfile::tempdir().unwrap();
    let mut collaborators = local_collaborators(&spool);
    collaborators.parser = Arc::new(BrokenParser);
    let (addr, _state) = spawn_service(collaborators).await;

    let client = ImportClient::new(format!("http://{addr}"));
    let accepted = client
        .submit(SAMPLE_DOC.to_vec(), "plan.txt", &ImportScenario::default(), |_| {})
        .await
        .unwrap();

    let tracker = client.watch(accepted.job_id, |_| {}).await.unwrap();

    assert_eq!(tracker.phase(), Phase::Error);
    assert!(tracker.error().unwrap().contains("model unavailable"));
    assert_eq!(tracker.status_of(StepKey::Ai), StepStatus::Error);
    // Everything after the failed step stays pending
    assert_eq!(tracker.status_of(StepKey::Plan), StepStatus::Pending);
    assert_eq!(tracker.status_of(StepKey::Finish), StepStatus::Pending);
    assert!(tracker.result().is_none());
}

#[tokio::test]
async fn empty_submission_is_rejected_synchronously() {
    let spool = tempfile::tempdir().unwrap();
    let (addr, state) = spawn_service(local_collaborators(&spool)).await;
    let client = ImportClient::new(format!("http://{addr}"));

    let result = client
        .submit(Vec::new(), "empty.txt", &ImportScenario::default(), |_| {})
        .await;

    match result {
        Err(ClientError::Rejected { status, .. }) => assert_eq!(status, 400),
        other => panic!("expected rejection, got {other:?}"),
    }
    // No job became observable
    assert_eq!(state.registry.len().await, 0);
}

#[tokio::test]
async fn watching_an_unknown_job_fails_fast() {
    let spool = tempfile::tempdir().unwrap();
    let (addr, _state) = spawn_service(local_collaborators(&spool)).await;
    let client = ImportClient::new(format!("http://{addr}")).with_reconnects(0, Duration::from_millis(10));

    let missing = uuid::Uuid::new_v4();
    match client.watch(missing, |_| {}).await {
        Err(ClientError::JobNotFound(id)) => assert_eq!(id, missing),
        other => panic!("expected JobNotFound, got {other:?}"),
    }
}

/// Fake progress endpoint whose first connection drops mid-job, forcing the
/// watcher to reconnect and resume from a single later snapshot.
mod flaky {
    use super::*;
    use axum::extract::State;
    use axum::response::sse::{Event, Sse};
    use axum::routing::get;
    use axum::Router;
    use chrono::Utc;
    use classflow_common::{JobSnapshot, StepState};
    use futures::stream::Stream;
    use std::convert::Infallible;

    fn snapshot(seq: u64, statuses: [StepStatus; StepKey::COUNT], finished: bool) -> JobSnapshot {
        JobSnapshot {
            job_id: uuid::Uuid::nil(),
            seq,
            steps: StepKey::ALL
                .iter()
                .zip(statuses)
                .map(|(&key, status)| StepState { key, status })
                .collect(),
            error: None,
            result: None,
            finished,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn events(
        State(connections): State<Arc<AtomicUsize>>,
    ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
        use StepStatus::{Active as A, Done as D, Pending as P};
        let attempt = connections.fetch_add(1, Ordering::SeqCst);

        let stream = async_stream::stream! {
            if attempt == 0 {
                // First connection: one early snapshot, then the transport
                // "drops" (stream ends with the job unfinished).
                let early = snapshot(1, [A, P, P, P, P, P, P], false);
                yield Ok(Event::default()
                    .event("snapshot")
                    .data(serde_json::to_string(&early).unwrap()));
            } else {
                // Reconnect: a single later snapshot reconstructs the lot.
                let late = snapshot(9, [D, D, D, D, A, P, P], false);
                yield Ok(Event::default()
                    .event("snapshot")
                    .data(serde_json::to_string(&late).unwrap()));
                let done = snapshot(14, [D, D, D, D, D, D, D], true);
                yield Ok(Event::default()
                    .event("snapshot")
                    .data(serde_json::to_string(&done).unwrap()));
            }
        };
        Sse::new(stream)
    }

    pub async fn spawn() -> (SocketAddr, Arc<AtomicUsize>) {
        let connections = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/api/imports/:job_id/events", get(events))
            .with_state(connections.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, connections)
    }
}

#[tokio::test]
async fn watcher_reconnects_after_transport_drop_and_resumes_from_one_snapshot() {
    let (addr, connections) = flaky::spawn().await;
    let client =
        ImportClient::new(format!("http://{addr}")).with_reconnects(3, Duration::from_millis(20));

    let mut percents = Vec::new();
    let tracker = client
        .watch(uuid::Uuid::nil(), |t| percents.push(t.percent()))
        .await
        .unwrap();

    assert_eq!(connections.load(Ordering::SeqCst), 2);
    assert_eq!(tracker.phase(), Phase::Done);
    assert_eq!(tracker.percent(), 100);
    // 0/6 floored at 5, then 4/6 = 67 after the gap, then terminal 100;
    // never decreasing despite the missed snapshots.
    assert_eq!(percents, vec![5, 67, 100]);
}
