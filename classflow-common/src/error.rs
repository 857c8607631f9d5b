//! Common error types for ClassFlow services

use thiserror::Error;

/// Common result type for ClassFlow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared across ClassFlow services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Illegal step status transition
    #[error("Invalid step transition: {0}")]
    InvalidTransition(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
