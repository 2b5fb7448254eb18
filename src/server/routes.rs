//! Routing for the tracker HTTP API.

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

/// Build the router over `state`.
///
/// Collection routes take a `tasks`, `epics` or `subtasks` segment; any
/// other segment answers 404.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/history", get(handlers::history))
        .route("/prioritized", get(handlers::prioritized))
        .route(
            "/{kind}",
            get(handlers::list_items)
                .post(handlers::save_item)
                .delete(handlers::clear_items),
        )
        .route(
            "/{kind}/{id}",
            get(handlers::get_item).delete(handlers::delete_item),
        )
        .route("/{kind}/{id}/subtasks", get(handlers::epic_subtasks))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
