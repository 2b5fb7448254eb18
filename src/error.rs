//! Error types for tracker
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args or config, unknown id)
//! - 3: Schedule conflict
//! - 4: Operation failed (I/O, snapshot write, lock)

use std::path::PathBuf;

use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Exit codes for the tracker CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const SCHEDULE_CONFLICT: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tracker operations
#[derive(Error, Debug)]
pub enum Error {
    // Business outcomes from the store (exit code 2 or 3)
    #[error(transparent)]
    Store(#[from] StoreError),

    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Operation failures (exit code 4)
    #[error("Failed to save snapshot to {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid snapshot at line {line}: {message}")]
    InvalidSnapshot { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    /// HTTP server failure (bind, accept loop)
    #[error(transparent)]
    Server(#[from] anyhow::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Store(StoreError::NotFound { .. })
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_) => exit_codes::USER_ERROR,

            Error::Store(StoreError::ScheduleConflict { .. }) => exit_codes::SCHEDULE_CONFLICT,

            Error::Persistence { .. }
            | Error::InvalidSnapshot { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::Server(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured context for machine-readable output.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::Store(StoreError::NotFound { kind, id }) => Some(json!({
                "kind": kind,
                "id": id,
            })),
            Error::Store(StoreError::ScheduleConflict {
                start,
                end,
                conflicting,
                conflicting_kind,
            }) => Some(json!({
                "start": crate::task::format_date_time(start),
                "end": crate::task::format_date_time(end),
                "conflicting": conflicting,
                "conflicting_kind": conflicting_kind,
            })),
            Error::Persistence { path, .. } | Error::LockFailed(path) => Some(json!({
                "path": path.display().to_string(),
            })),
            Error::InvalidSnapshot { line, .. } => Some(json!({ "line": line })),
            _ => None,
        }
    }
}

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
