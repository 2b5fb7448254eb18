//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::error::Error;
use crate::store::StoreError;
use crate::task::{format_date_time, TaskId, TaskKind};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{kind} {id} not found")]
    NotFound { kind: TaskKind, id: TaskId },

    #[error("no such resource: /{segment}")]
    UnknownResource { segment: String },

    #[error("interval {start} - {end} overlaps {conflicting_kind} {conflicting}")]
    ScheduleConflict {
        start: String,
        end: String,
        conflicting: TaskId,
        conflicting_kind: TaskKind,
    },

    #[error("{message}")]
    BadRequest {
        message: String,
        fields: Vec<FieldError>,
    },

    #[error("{message}")]
    Internal { message: String },
}

/// One invalid field of a request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn validation(fields: Vec<FieldError>) -> Self {
        Self::BadRequest {
            message: "request body failed validation".to_string(),
            fields,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } | Self::UnknownResource { .. } => StatusCode::NOT_FOUND,
            Self::ScheduleConflict { .. } => StatusCode::NOT_ACCEPTABLE,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } | Self::UnknownResource { .. } => "NOT_FOUND",
            Self::ScheduleConflict { .. } => "SCHEDULE_CONFLICT",
            Self::BadRequest { fields, .. } if !fields.is_empty() => "VALIDATION_ERROR",
            Self::BadRequest { .. } => "BAD_REQUEST",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => Self::NotFound { kind, id },
            StoreError::ScheduleConflict {
                start,
                end,
                conflicting,
                conflicting_kind,
            } => Self::ScheduleConflict {
                start: format_date_time(&start),
                end: format_date_time(&end),
                conflicting,
                conflicting_kind,
            },
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Store(store) => store.into(),
            Error::InvalidArgument(message) => Self::bad_request(message),
            other => {
                error!(error = %other, "request failed");
                Self::Internal {
                    message: other.to_string(),
                }
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldError>,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();
        let fields = match self {
            Self::BadRequest { fields, .. } => fields,
            _ => Vec::new(),
        };
        let body = ErrorEnvelope {
            error: ErrorBody {
                code,
                message,
                fields,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    #[test]
    fn store_errors_map_to_status_codes() {
        let missing: ApiError = StoreError::NotFound {
            kind: TaskKind::Epic,
            id: 4,
        }
        .into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_string(), "epic 4 not found");

        let at = NaiveDate::from_ymd_opt(2026, 4, 10)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let conflict: ApiError = StoreError::ScheduleConflict {
            start: at,
            end: at,
            conflicting: 1,
            conflicting_kind: TaskKind::Task,
        }
        .into();
        assert_eq!(conflict.status_code(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(conflict.error_code(), "SCHEDULE_CONFLICT");
    }

    #[test]
    fn persistence_failure_is_internal() {
        let err: ApiError = Error::Persistence {
            path: PathBuf::from("tasks.csv"),
            source: Box::new(Error::LockFailed(PathBuf::from("tasks.csv.lock"))),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_code_depends_on_fields() {
        assert_eq!(ApiError::bad_request("x").error_code(), "BAD_REQUEST");
        let err = ApiError::validation(vec![FieldError::new("name", "is required")]);
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }
}
