pub mod dashboard;
pub mod health;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                                   WebSocket (join/leave patient groups)
///
/// /dashboard/alerts                     grouped alert episodes
/// /dashboard/patients                   patient roster with history
/// /dashboard/patients/{id}/vitals       recorded vitals, newest first
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/dashboard", dashboard::router())
}
