use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pulseward_api::config::ServerConfig;
use pulseward_api::router::build_app_router;
use pulseward_api::state::AppState;
use pulseward_api::ws;
use pulseward_events::{PgStore, RecordFlusher, SimulationScheduler, WriteBehindBuffer};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long each background task gets to wind down after shutdown.
const TASK_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pulseward_api=debug,pulseward_events=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        tick_ms = config.simulation_tick_ms,
        flush_secs = config.record_flush_interval_secs,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = pulseward_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    pulseward_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    pulseward_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- WebSocket manager + heartbeat ---
    let ws_manager = Arc::new(ws::WsManager::new());
    let heartbeat_cancel = CancellationToken::new();
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager), heartbeat_cancel.clone());

    // --- Monitoring pipeline ---
    let store = Arc::new(PgStore::new(pool.clone()));
    let buffer = Arc::new(WriteBehindBuffer::new());

    let simulation_cancel = CancellationToken::new();
    let scheduler = SimulationScheduler::new(
        store.clone(),
        ws_manager.clone(),
        Arc::clone(&buffer),
        config.simulation_tick(),
    );
    let simulation_handle = tokio::spawn(scheduler.run(simulation_cancel.clone()));

    let flush_cancel = CancellationToken::new();
    let flusher = RecordFlusher::new(Arc::clone(&buffer), store, config.record_flush_interval());
    let flush_handle = tokio::spawn(flusher.run(flush_cancel.clone()));

    tracing::info!("Monitoring pipeline started (scheduler, record flusher)");

    // --- App state + router ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stop producing records before the final flush.
    simulation_cancel.cancel();
    let _ = tokio::time::timeout(TASK_SHUTDOWN_TIMEOUT, simulation_handle).await;
    tracing::info!("Simulation scheduler stopped");

    flush_cancel.cancel();
    if tokio::time::timeout(TASK_SHUTDOWN_TIMEOUT, flush_handle)
        .await
        .is_err()
    {
        tracing::warn!("Record flusher did not finish in time, pending records dropped");
    } else {
        tracing::info!("Record flusher stopped");
    }

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    heartbeat_cancel.cancel();
    let _ = tokio::time::timeout(TASK_SHUTDOWN_TIMEOUT, heartbeat_handle).await;
    tracing::info!("Heartbeat task stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
