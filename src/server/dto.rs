//! Request and response bodies.

use serde::{Deserialize, Serialize};

use super::error::{ApiError, FieldError};
use crate::task::{
    end_of, format_date_time, parse_date_time, Epic, Item, Status, Subtask, Task, TaskId, TaskKind,
};

// =============================================================================
// Request
// =============================================================================

/// Body of `POST /{kind}`. Without `id` it creates, with `id` it updates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    pub id: Option<TaskId>,
    #[serde(rename = "type")]
    pub kind: Option<TaskKind>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<Status>,
    pub start_time: Option<String>,
    pub duration: Option<u32>,
    pub epic_id: Option<TaskId>,
}

impl ItemRequest {
    /// Parse a request body, mapping malformed JSON to 400.
    pub fn from_slice(body: &[u8]) -> Result<Self, ApiError> {
        serde_json::from_slice(body)
            .map_err(|err| ApiError::bad_request(format!("malformed request body: {err}")))
    }

    /// Validate against the route's kind and build the entity.
    pub fn into_item(self, kind: TaskKind) -> Result<Item, ApiError> {
        let mut fields = Vec::new();

        if let Some(declared) = self.kind {
            if declared != kind {
                fields.push(FieldError::new(
                    "type",
                    format!("is {declared}, expected {kind}"),
                ));
            }
        }
        if self.name.is_none() {
            fields.push(FieldError::new("name", "is required"));
        }
        if self.description.is_none() {
            fields.push(FieldError::new("description", "is required"));
        }

        let start_time = match self.start_time.as_deref() {
            None => None,
            Some(raw) => match parse_date_time(raw) {
                Some(start) => Some(start),
                None => {
                    fields.push(FieldError::new(
                        "startTime",
                        format!("'{raw}' is not dd.MM.yyyy HH:mm"),
                    ));
                    None
                }
            },
        };

        match kind {
            TaskKind::Epic => {
                for (field, present) in [
                    ("status", self.status.is_some()),
                    ("startTime", self.start_time.is_some()),
                    ("duration", self.duration.is_some()),
                    ("epicId", self.epic_id.is_some()),
                ] {
                    if present {
                        fields.push(FieldError::new(field, "is derived for epics"));
                    }
                }
            }
            TaskKind::Task | TaskKind::Subtask => {
                if self.status.is_none() {
                    fields.push(FieldError::new("status", "is required"));
                }
                if self.start_time.is_some() != self.duration.is_some() {
                    fields.push(FieldError::new(
                        "startTime",
                        "startTime and duration must be given together",
                    ));
                }
                if let (Some(start), Some(minutes)) = (start_time, self.duration) {
                    if end_of(start, minutes).is_none() {
                        fields.push(FieldError::new(
                            "duration",
                            "ends past the last representable instant",
                        ));
                    }
                }
                if kind == TaskKind::Subtask && self.epic_id.is_none() {
                    fields.push(FieldError::new("epicId", "is required"));
                }
                if kind == TaskKind::Task && self.epic_id.is_some() {
                    fields.push(FieldError::new("epicId", "only applies to subtasks"));
                }
            }
        }

        if !fields.is_empty() {
            return Err(ApiError::validation(fields));
        }

        let name = self.name.unwrap_or_default();
        let description = self.description.unwrap_or_default();
        let status = self.status.unwrap_or_default();
        let id = self.id.unwrap_or_default();

        let item = match kind {
            TaskKind::Task => Item::Task(Task {
                id,
                name,
                description,
                status,
                start_time,
                duration: self.duration,
            }),
            TaskKind::Epic => Item::Epic(Epic::new(name, description).with_id(id)),
            TaskKind::Subtask => Item::Subtask(Subtask {
                id,
                epic_id: self.epic_id.unwrap_or_default(),
                name,
                description,
                status,
                start_time,
                duration: self.duration,
            }),
        };
        Ok(item)
    }
}

// =============================================================================
// Response
// =============================================================================

/// JSON shape of any entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    pub id: TaskId,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub name: String,
    pub description: String,
    pub status: Status,
    pub start_time: Option<String>,
    pub duration: Option<u32>,
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epic_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtask_ids: Option<Vec<TaskId>>,
}

impl From<&Item> for ItemView {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id(),
            kind: item.kind(),
            name: item.name().to_string(),
            description: item.description().to_string(),
            status: item.status(),
            start_time: item.start_time().map(|t| format_date_time(&t)),
            duration: item.duration(),
            end_time: item.end_time().map(|t| format_date_time(&t)),
            epic_id: item.epic_id(),
            subtask_ids: match item {
                Item::Epic(epic) => Some(epic.subtask_ids().to_vec()),
                _ => None,
            },
        }
    }
}

impl From<Item> for ItemView {
    fn from(item: Item) -> Self {
        Self::from(&item)
    }
}

/// Body of `DELETE /{kind}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearedResponse {
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub removed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> ItemRequest {
        ItemRequest::from_slice(json.as_bytes()).unwrap()
    }

    fn field_names(err: ApiError) -> Vec<String> {
        match err {
            ApiError::BadRequest { fields, .. } => fields.into_iter().map(|f| f.field).collect(),
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[test]
    fn task_requires_core_fields() {
        let err = request("{}").into_item(TaskKind::Task).unwrap_err();
        assert_eq!(field_names(err), vec!["name", "description", "status"]);
    }

    #[test]
    fn schedule_fields_come_together() {
        let err = request(r#"{"name":"a","description":"b","status":"NEW","duration":5}"#)
            .into_item(TaskKind::Task)
            .unwrap_err();
        assert_eq!(field_names(err), vec!["startTime"]);
    }

    #[test]
    fn epic_rejects_derived_fields() {
        let err = request(r#"{"name":"a","description":"b","status":"DONE"}"#)
            .into_item(TaskKind::Epic)
            .unwrap_err();
        assert_eq!(field_names(err), vec!["status"]);
    }

    #[test]
    fn subtask_builds_with_schedule() {
        let item = request(
            r#"{"name":"a","description":"b","status":"IN_PROGRESS","epicId":3,
                "startTime":"10.04.2026 09:15","duration":45}"#,
        )
        .into_item(TaskKind::Subtask)
        .unwrap();
        let view = ItemView::from(&item);
        assert_eq!(view.epic_id, Some(3));
        assert_eq!(view.end_time.as_deref(), Some("10.04.2026 10:00"));
    }

    #[test]
    fn malformed_json_and_bad_status_are_bad_requests() {
        assert!(ItemRequest::from_slice(b"{not json").is_err());
        assert!(ItemRequest::from_slice(br#"{"status":"CLOSED"}"#).is_err());
    }

    #[test]
    fn bad_start_time_is_reported() {
        let err = request(r#"{"name":"a","description":"b","status":"NEW","startTime":"tomorrow","duration":5}"#)
            .into_item(TaskKind::Task)
            .unwrap_err();
        assert_eq!(field_names(err), vec!["startTime"]);
    }

    #[test]
    fn end_past_the_calendar_is_a_validation_error() {
        let err = request(
            r#"{"name":"a","description":"b","status":"NEW",
                "startTime":"01.01.+262000 00:00","duration":4294967295}"#,
        )
        .into_item(TaskKind::Task)
        .unwrap_err();
        assert_eq!(field_names(err), vec!["duration"]);
    }
}
