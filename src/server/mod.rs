//! HTTP server mode
//!
//! Accepts download requests, tracks each one as a task, and runs the
//! downloads in the background on a bounded pool.

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod page;
pub mod routes;
pub mod state;
pub mod worker;

pub use state::AppState;

/// Builds the router.
///
/// - `GET /` - control page
/// - `POST /api/download` - start a download
/// - `GET /api/status?task_id=ID` - one task
/// - `GET /api/tasks` - all tasks
/// - `GET /api/config` - current configuration, credentials redacted
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/api/download", post(routes::start_download))
        .route("/api/status", get(routes::task_status))
        .route("/api/tasks", get(routes::list_tasks))
        .route("/api/config", get(routes::get_config))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serves until the process is stopped.
pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(address = %addr, "server listening");
    println!("Open your browser and go to: http://{addr}");

    axum::serve(listener, app).await.context("server error")?;
    tracing::info!("server stopped");
    Ok(())
}
