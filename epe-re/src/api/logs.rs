//! Log retrieval endpoints

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use epe_common::logging::tail_lines;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DEFAULT_LINES: usize = 200;
const MAX_LINES: usize = 5000;

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub lines: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub file: String,
    pub logs: Vec<String>,
}

/// Configured log file, or 404 when file logging is off or nothing was written yet
fn log_path(state: &AppState) -> ApiResult<&PathBuf> {
    let path = state
        .log_file
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("file logging is disabled".to_string()))?;
    if !path.exists() {
        return Err(ApiError::NotFound(format!(
            "log file {} does not exist",
            path.display()
        )));
    }
    Ok(path)
}

/// GET /api/logs?lines=N
///
/// Last N lines of the log file (default 200, capped at 5000).
pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> ApiResult<Json<LogResponse>> {
    let path = log_path(&state)?;
    let count = query.lines.unwrap_or(DEFAULT_LINES).min(MAX_LINES);
    let logs = tail_lines(path, count)?;
    Ok(Json(LogResponse {
        file: path.display().to_string(),
        logs,
    }))
}

/// GET /api/logs/export
///
/// Whole log file as a plain-text download.
pub async fn export_logs(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let path = log_path(&state)?;
    let content = tokio::fs::read(path)
        .await
        .map_err(epe_common::Error::from)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "server.log".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", super::download_name(&file_name)),
            ),
        ],
        content,
    ))
}
