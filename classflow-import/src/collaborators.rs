//! External collaborator boundary
//!
//! The pipeline runner sequences steps; the work itself is done by these
//! collaborators. Each trait maps to one external service: file storage,
//! document text extraction, AI curriculum parsing, and the entity writers
//! (study plan, lessons, curriculum plan). The runner holds them as trait
//! objects so deployments can wire real clients while tests inject scripted
//! doubles.

use async_trait::async_trait;
use classflow_common::Error;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

pub use classflow_common::ImportScenario;

/// Reference to an accepted upload
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_id: Uuid,
    pub filename: String,
    pub path: PathBuf,
    pub size_bytes: usize,
}

/// One lesson parsed out of the source document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedLesson {
    pub title: String,
    #[serde(default)]
    pub hours: Option<u32>,
}

/// Structured curriculum returned by the AI parser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedCurriculum {
    pub title: String,
    pub lessons: Vec<ParsedLesson>,
}

/// File storage accepting binary uploads
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn store(&self, data: &[u8], filename: &str) -> Result<StoredFile, Error>;
}

/// Document text extraction
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, file: &StoredFile) -> Result<String, Error>;
}

/// AI-assisted curriculum parsing
#[async_trait]
pub trait CurriculumParser: Send + Sync {
    async fn parse(
        &self,
        text: &str,
        scenario: &ImportScenario,
    ) -> Result<ParsedCurriculum, Error>;
}

/// Entity creation: study plan, lesson batch, curriculum plan
#[async_trait]
pub trait PlanWriter: Send + Sync {
    async fn create_study_plan(
        &self,
        curriculum: &ParsedCurriculum,
        scenario: &ImportScenario,
    ) -> Result<Uuid, Error>;

    async fn create_lessons(
        &self,
        study_plan_id: Uuid,
        lessons: &[ParsedLesson],
    ) -> Result<usize, Error>;

    async fn create_curriculum_plan(
        &self,
        study_plan_id: Uuid,
        curriculum: &ParsedCurriculum,
    ) -> Result<Uuid, Error>;
}

/// Bundle of collaborators injected into the runner
#[derive(Clone)]
pub struct Collaborators {
    pub file_store: Arc<dyn FileStore>,
    pub text_extractor: Arc<dyn TextExtractor>,
    pub parser: Arc<dyn CurriculumParser>,
    pub plan_writer: Arc<dyn PlanWriter>,
}

impl Collaborators {
    /// Local in-process stand-ins, used by the dev binary and tests
    pub fn local(spool_dir: PathBuf) -> Self {
        Self {
            file_store: Arc::new(local::LocalFileStore::new(spool_dir)),
            text_extractor: Arc::new(local::LocalTextExtractor),
            parser: Arc::new(local::LineCurriculumParser),
            plan_writer: Arc::new(local::LocalPlanWriter),
        }
    }
}

/// Local stand-in collaborators
///
/// Stand in for the external services when running the binary outside a full
/// deployment: the file store spools to disk, extraction is a lossy UTF-8
/// read, and the parser treats each non-empty line as one lesson.
pub mod local {
    use super::*;
    use tracing::debug;

    pub struct LocalFileStore {
        spool_dir: PathBuf,
    }

    impl LocalFileStore {
        pub fn new(spool_dir: PathBuf) -> Self {
            Self { spool_dir }
        }
    }

    #[async_trait]
    impl FileStore for LocalFileStore {
        async fn store(&self, data: &[u8], filename: &str) -> Result<StoredFile, Error> {
            let file_id = Uuid::new_v4();
            tokio::fs::create_dir_all(&self.spool_dir).await?;
            let path = self.spool_dir.join(file_id.to_string());
            tokio::fs::write(&path, data).await?;
            debug!(file_id = %file_id, filename, size = data.len(), "upload spooled");
            Ok(StoredFile {
                file_id,
                filename: filename.to_string(),
                path,
                size_bytes: data.len(),
            })
        }
    }

    pub struct LocalTextExtractor;

    #[async_trait]
    impl TextExtractor for LocalTextExtractor {
        async fn extract(&self, file: &StoredFile) -> Result<String, Error> {
            let bytes = tokio::fs::read(&file.path).await?;
            let text = String::from_utf8_lossy(&bytes).into_owned();
            if text.trim().is_empty() {
                return Err(Error::InvalidInput(format!(
                    "no extractable text in {}",
                    file.filename
                )));
            }
            Ok(text)
        }
    }

    /// One lesson per non-empty line; the first line names the plan
    pub struct LineCurriculumParser;

    #[async_trait]
    impl CurriculumParser for LineCurriculumParser {
        async fn parse(
            &self,
            text: &str,
            scenario: &ImportScenario,
        ) -> Result<ParsedCurriculum, Error> {
            let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
            let title = lines
                .next()
                .map(str::to_string)
                .or_else(|| scenario.subject.clone())
                .ok_or_else(|| Error::InvalidInput("document is empty".to_string()))?;

            let lessons: Vec<ParsedLesson> = lines
                .map(|line| ParsedLesson {
                    title: line.to_string(),
                    hours: None,
                })
                .collect();
            if lessons.is_empty() {
                return Err(Error::InvalidInput(
                    "no lessons recognized in document".to_string(),
                ));
            }

            Ok(ParsedCurriculum { title, lessons })
        }
    }

    pub struct LocalPlanWriter;

    #[async_trait]
    impl PlanWriter for LocalPlanWriter {
        async fn create_study_plan(
            &self,
            curriculum: &ParsedCurriculum,
            _scenario: &ImportScenario,
        ) -> Result<Uuid, Error> {
            debug!(title = %curriculum.title, "study plan created");
            Ok(Uuid::new_v4())
        }

        async fn create_lessons(
            &self,
            study_plan_id: Uuid,
            lessons: &[ParsedLesson],
        ) -> Result<usize, Error> {
            debug!(study_plan_id = %study_plan_id, count = lessons.len(), "lessons created");
            Ok(lessons.len())
        }

        async fn create_curriculum_plan(
            &self,
            study_plan_id: Uuid,
            _curriculum: &ParsedCurriculum,
        ) -> Result<Uuid, Error> {
            debug!(study_plan_id = %study_plan_id, "curriculum plan created");
            Ok(Uuid::new_v4())
        }
    }
}
