//! HTTP API surface of the import service

pub mod health;
pub mod imports;
pub mod sse;

pub use health::health_routes;
pub use imports::import_routes;
pub use sse::job_event_stream;
