//! Route handlers.

use crate::core::descriptor::classify;
use crate::server::page::INDEX_HTML;
use crate::server::state::AppState;
use crate::server::worker::process_task;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub quality: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub task_id: Option<String>,
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// GET / - control page
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// POST /api/download - validate, register and start a download
pub async fn start_download(
    State(state): State<AppState>,
    body: Result<Json<DownloadRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = body else {
        return error(StatusCode::BAD_REQUEST, "Invalid request body");
    };
    let url = match req.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => return error(StatusCode::BAD_REQUEST, "URL is required"),
    };

    let descriptor = classify(&url);
    if !descriptor.is_valid() {
        return error(StatusCode::BAD_REQUEST, "Invalid Apple Music URL");
    }

    let kind = req
        .kind
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| descriptor.media_type.to_string());
    let preset = req.quality.unwrap_or_else(|| "alac".to_string());
    let quality = state.base_quality.with_preset(&preset);

    let task = state.registry.create(&url, &kind, &preset);
    tracing::info!(task_id = %task.id, url = %url, media_type = %descriptor.media_type, "download task created");

    tokio::spawn(process_task(state.clone(), task.id.clone(), url, quality));

    (
        StatusCode::OK,
        Json(json!({ "task_id": task.id, "status": "started" })),
    )
        .into_response()
}

/// GET /api/status?task_id=ID - one task
pub async fn task_status(State(state): State<AppState>, Query(query): Query<StatusQuery>) -> Response {
    let Some(task_id) = query.task_id.filter(|id| !id.is_empty()) else {
        return error(StatusCode::BAD_REQUEST, "Task ID is required");
    };
    match state.registry.get(&task_id) {
        Some(task) => (StatusCode::OK, Json(task)).into_response(),
        None => error(StatusCode::NOT_FOUND, "Task not found"),
    }
}

/// GET /api/tasks - every retained task
pub async fn list_tasks(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.list())
}

/// GET /api/config - configuration with credentials redacted
pub async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.config.redacted())
}
