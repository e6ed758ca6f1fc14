//! Map service error types

use shared::SharedError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Worker failed to start: {reason}")]
    StartFailure { reason: String },

    #[error("Timed out after {timeout:?} waiting for {operation}")]
    Timeout { operation: String, timeout: Duration },

    #[error("Worker acknowledged '{command}' with an unexpected value (expected {expected}): {raw}")]
    ProtocolViolation { command: String, expected: i64, raw: String },

    #[error("Worker process is gone: {reason}")]
    ProcessDied { reason: String },

    #[error("Asset catalog error: {message}")]
    CatalogError { message: String },

    #[error("External command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Command queue is closed")]
    QueueClosed,

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl MapError {
    pub fn start(reason: impl Into<String>) -> Self {
        MapError::StartFailure { reason: reason.into() }
    }

    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        MapError::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    pub fn process_died(reason: impl Into<String>) -> Self {
        MapError::ProcessDied { reason: reason.into() }
    }

    pub fn catalog(message: impl Into<String>) -> Self {
        MapError::CatalogError { message: message.into() }
    }

    pub fn config(field: impl Into<String>) -> Self {
        MapError::ConfigurationError { field: field.into() }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, MapError::Timeout { .. })
    }
}

pub type MapResult<T> = Result<T, MapError>;
