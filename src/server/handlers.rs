use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::dto::{ClearedResponse, ItemRequest, ItemView};
use super::error::ApiError;
use super::state::AppState;
use crate::task::{Item, TaskId, TaskKind};

/// Map a collection segment (`tasks`, `epics`, `subtasks`) to its kind.
pub fn kind_from_segment(segment: &str) -> Result<TaskKind, ApiError> {
    match segment {
        "tasks" => Ok(TaskKind::Task),
        "epics" => Ok(TaskKind::Epic),
        "subtasks" => Ok(TaskKind::Subtask),
        other => Err(ApiError::UnknownResource {
            segment: other.to_string(),
        }),
    }
}

fn parse_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("invalid id '{raw}'")))
}

fn views(items: &[Item]) -> Vec<ItemView> {
    items.iter().map(ItemView::from).collect()
}

// =============================================================================
// Collections
// =============================================================================

pub async fn list_items(
    State(state): State<AppState>,
    Path(segment): Path<String>,
) -> Result<Json<Vec<ItemView>>, ApiError> {
    let kind = kind_from_segment(&segment)?;
    let files = state.store.lock().await;
    Ok(Json(views(&files.list(kind))))
}

/// Create when the body carries no id, update otherwise.
pub async fn save_item(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<ItemView>), ApiError> {
    let kind = kind_from_segment(&segment)?;
    let request = ItemRequest::from_slice(&body)?;
    let existing = request.id;
    let item = request.into_item(kind)?;

    let mut files = state.store.lock().await;
    let id = match existing {
        Some(id) => {
            files.update(item)?;
            id
        }
        None => files.create(item)?,
    };
    let stored = files
        .store()
        .lookup(kind, id)
        .ok_or(ApiError::NotFound { kind, id })?;
    Ok((StatusCode::CREATED, Json(ItemView::from(stored))))
}

pub async fn clear_items(
    State(state): State<AppState>,
    Path(segment): Path<String>,
) -> Result<Json<ClearedResponse>, ApiError> {
    let kind = kind_from_segment(&segment)?;
    let mut files = state.store.lock().await;
    let removed = files.list(kind).len();
    files.remove_all(kind)?;
    Ok(Json(ClearedResponse { kind, removed }))
}

// =============================================================================
// Single items
// =============================================================================

pub async fn get_item(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
) -> Result<Json<ItemView>, ApiError> {
    let kind = kind_from_segment(&segment)?;
    let id = parse_id(&id)?;
    let mut files = state.store.lock().await;
    let item = files.get(kind, id)?;
    Ok(Json(ItemView::from(item)))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
) -> Result<Json<ItemView>, ApiError> {
    let kind = kind_from_segment(&segment)?;
    let id = parse_id(&id)?;
    let mut files = state.store.lock().await;
    let removed = files.remove(kind, id)?;
    Ok(Json(ItemView::from(removed)))
}

/// `GET /epics/{id}/subtasks`. Counts as a view of the epic.
pub async fn epic_subtasks(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
) -> Result<Json<Vec<ItemView>>, ApiError> {
    if kind_from_segment(&segment)? != TaskKind::Epic {
        return Err(ApiError::UnknownResource {
            segment: format!("{segment}/{id}/subtasks"),
        });
    }
    let id = parse_id(&id)?;
    let mut files = state.store.lock().await;
    let subtasks: Vec<Item> = files.subtasks_of(id)?.into_iter().map(Item::from).collect();
    Ok(Json(views(&subtasks)))
}

// =============================================================================
// Derived views
// =============================================================================

pub async fn history(State(state): State<AppState>) -> Json<Vec<ItemView>> {
    let files = state.store.lock().await;
    Json(views(&files.history()))
}

pub async fn prioritized(State(state): State<AppState>) -> Json<Vec<ItemView>> {
    let files = state.store.lock().await;
    Json(views(&files.prioritized()))
}
