use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::FixedOffset;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use pulseward_api::config::ServerConfig;
use pulseward_api::router::build_app_router;
use pulseward_api::state::AppState;
use pulseward_api::ws::WsManager;

/// Build a test `ServerConfig` with safe defaults and UTC labels.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        simulation_tick_ms: 200,
        record_flush_interval_secs: 60,
        alert_log_limit: 100,
        alert_log_offset: FixedOffset::east_opt(0).unwrap(),
    }
}

/// Build the full application router, with the production middleware
/// stack, over the given database pool.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_manager: Arc::new(WsManager::new()),
    };
    build_app_router(state, &config)
}

/// Send a GET request through the router.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
