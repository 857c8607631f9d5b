//! Pipeline runner
//!
//! Executes the seven import steps strictly in canonical order, updating the
//! job record around every collaborator call: `active` before the call,
//! `done` after it, `error` + terminal on the first failure (later steps
//! stay pending, nothing is retried). Every collaborator call runs under a
//! liveness timeout so a wedged external service cannot hang the job
//! forever.
//!
//! The runner owns sequencing and status bookkeeping only; all business
//! logic lives behind the collaborator traits.

use crate::collaborators::{Collaborators, ImportScenario};
use crate::registry::JobRegistry;
use classflow_common::{Error, ImportOutcome, StepKey};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Everything the submitter hands the runner for one job
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub data: Vec<u8>,
    pub filename: String,
    pub scenario: ImportScenario,
}

/// Per-job pipeline executor
#[derive(Clone)]
pub struct PipelineRunner {
    registry: Arc<JobRegistry>,
    collaborators: Collaborators,
    step_timeout: Duration,
}

impl PipelineRunner {
    pub fn new(
        registry: Arc<JobRegistry>,
        collaborators: Collaborators,
        step_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            collaborators,
            step_timeout,
        }
    }

    /// Drive one job to a terminal state
    ///
    /// The returned error mirrors what was already recorded on the job; the
    /// caller only needs it for diagnostics (the record is terminal either
    /// way).
    pub async fn run(&self, job_id: Uuid, request: ImportRequest) -> anyhow::Result<()> {
        info!(job_id = %job_id, filename = %request.filename, "import pipeline started");
        match self.execute(job_id, request).await {
            Ok(()) => {
                info!(job_id = %job_id, "import pipeline completed");
                Ok(())
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "import pipeline aborted");
                Err(e)
            }
        }
    }

    async fn execute(&self, job_id: Uuid, request: ImportRequest) -> anyhow::Result<()> {
        let scenario = request.scenario.clone();

        let stored = self
            .step(job_id, StepKey::Upload, {
                let store = self.collaborators.file_store.clone();
                let data = request.data;
                let filename = request.filename.clone();
                async move { store.store(&data, &filename).await }
            })
            .await?;

        let text = self
            .step(job_id, StepKey::Extract, {
                let extractor = self.collaborators.text_extractor.clone();
                let stored = stored.clone();
                async move { extractor.extract(&stored).await }
            })
            .await?;

        let parsed = self
            .step(job_id, StepKey::Ai, {
                let parser = self.collaborators.parser.clone();
                let scenario = scenario.clone();
                async move { parser.parse(&text, &scenario).await }
            })
            .await?;

        let study_plan_id = self
            .step(job_id, StepKey::Plan, {
                let writer = self.collaborators.plan_writer.clone();
                let parsed = parsed.clone();
                let scenario = scenario.clone();
                async move { writer.create_study_plan(&parsed, &scenario).await }
            })
            .await?;

        let lesson_count = self
            .step(job_id, StepKey::Lessons, {
                let writer = self.collaborators.plan_writer.clone();
                let lessons = parsed.lessons.clone();
                async move { writer.create_lessons(study_plan_id, &lessons).await }
            })
            .await?;

        let curriculum_plan_id = self
            .step(job_id, StepKey::Curriculum, {
                let writer = self.collaborators.plan_writer.clone();
                let parsed = parsed.clone();
                async move { writer.create_curriculum_plan(study_plan_id, &parsed).await }
            })
            .await?;

        // Trailing bookkeeping step: no collaborator, just assemble the
        // outcome and close the job out.
        self.registry
            .update(job_id, |record| record.begin_step(StepKey::Finish))
            .await?;
        self.registry
            .update(job_id, move |record| {
                record.finish(ImportOutcome {
                    study_plan_id,
                    curriculum_plan_id,
                    lesson_count,
                })
            })
            .await?;

        Ok(())
    }

    /// Run one step: mark active, await the collaborator under the liveness
    /// timeout, then mark done or record the failure and terminate the job.
    async fn step<T, F>(&self, job_id: Uuid, key: StepKey, work: F) -> anyhow::Result<T>
    where
        F: Future<Output = Result<T, Error>>,
    {
        self.registry
            .update(job_id, move |record| record.begin_step(key))
            .await?;

        let outcome = match tokio::time::timeout(self.step_timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(Error::Internal(format!(
                "step {key} timed out after {}s",
                self.step_timeout.as_secs()
            ))),
        };

        match outcome {
            Ok(value) => {
                self.registry
                    .update(job_id, move |record| record.complete_step(key))
                    .await?;
                Ok(value)
            }
            Err(e) => {
                let message = e.to_string();
                error!(job_id = %job_id, step = %key, error = %message, "import step failed");
                self.registry
                    .update(job_id, move |record| record.fail_step(key, message))
                    .await?;
                Err(e.into())
            }
        }
    }
}
