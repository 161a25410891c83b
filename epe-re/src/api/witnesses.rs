//! Witness endpoints
//!
//! Listing returns `{id, label}` only; the token payload is served one
//! witness at a time.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use epe_common::{Witness, WitnessSummary};
use serde::Serialize;

use super::{parse_json_object, required_str};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CreatedWitness {
    pub id: String,
}

/// GET /api/witnesses
pub async fn list_witnesses(State(state): State<AppState>) -> Json<Vec<WitnessSummary>> {
    let store = state.store.read().await;
    Json(store.list_witness_summaries())
}

/// GET /api/witnesses/:id
pub async fn get_witness(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Witness>> {
    let store = state.store.read().await;
    Ok(Json(store.get_witness(&id)?.clone()))
}

/// POST /api/witnesses
///
/// Body is the full witness record including `id`, `label` and `sections`.
pub async fn create_witness(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<CreatedWitness>)> {
    let record = parse_json_object(&body)?;
    let mut store = state.store.write().await;
    let id = store.create_witness_from_json(record)?;
    Ok((StatusCode::CREATED, Json(CreatedWitness { id })))
}

/// PATCH (or PUT) /api/witnesses/:id
///
/// **Request:** `{"label": "new label"}`
/// **Response:** the updated `{id, label}`
pub async fn update_witness_label(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<WitnessSummary>> {
    let body = parse_json_object(&body)?;
    let label = required_str(&body, "label")?;

    let mut store = state.store.write().await;
    store.update_witness_label(&id, label)?;
    Ok(Json(store.get_witness(&id)?.summary()))
}

/// DELETE /api/witnesses/:id
///
/// Annotations on the witness are deleted in the same call. 204 on success.
pub async fn delete_witness(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let mut store = state.store.write().await;
    store.delete_witness(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
