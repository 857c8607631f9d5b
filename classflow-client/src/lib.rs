//! # ClassFlow Import Client
//!
//! Subscriber side of the import progress pipeline:
//! - submit a document for import, with a byte-level upload progress
//!   callback taken from the transport
//! - watch a job over SSE, reconciling each full snapshot into a stable
//!   step list, a coarse phase, and a single percentage
//!
//! Upload byte progress and step progress stay two separate sources and are
//! reconciled only here, never on the server.

pub mod error;
pub mod progress;
pub mod sse;
pub mod subscriber;

pub use error::ClientError;
pub use progress::{Phase, ProgressTracker, StepView};
pub use subscriber::ImportClient;
