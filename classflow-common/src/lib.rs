//! # ClassFlow Common Library
//!
//! Shared contract between the import service and its subscribers:
//! - Canonical import step keys and the per-step status state machine
//! - Job snapshot wire types pushed over SSE
//! - Shared API request/response types
//! - SnapshotBus for in-process fan-out to stream handlers
//! - Common error types

pub mod api;
pub mod bus;
pub mod error;
pub mod snapshot;
pub mod steps;

pub use api::{ImportScenario, SubmitResponse};
pub use bus::SnapshotBus;
pub use error::{Error, Result};
pub use snapshot::{ImportOutcome, JobSnapshot, StepState};
pub use steps::{StepKey, StepStatus};
