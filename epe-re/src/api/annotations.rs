//! Annotation endpoints

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use epe_common::{Annotation, Error, NewAnnotation};
use serde::Deserialize;

use super::{parse_json_object, required_str};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AnnotationQuery {
    pub witness_id: Option<String>,
}

fn parse_annotation_id(raw: &str) -> ApiResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| Error::InvalidInput(format!("annotation id '{}' is not an integer", raw)).into())
}

/// GET /api/annotations?witness_id=
pub async fn list_annotations(
    State(state): State<AppState>,
    Query(query): Query<AnnotationQuery>,
) -> Json<Vec<Annotation>> {
    let store = state.store.read().await;
    Json(
        store
            .list_annotations(query.witness_id.as_deref())
            .into_iter()
            .cloned()
            .collect(),
    )
}

/// POST /api/annotations
///
/// **Request:** `{"witness_id": "...", "token_id": "...", "annotation": "..."}`
/// **Response:** the created record, including its assigned id
pub async fn create_annotation(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Annotation>)> {
    let body = parse_json_object(&body)?;
    let draft: NewAnnotation = serde_json::from_value(body)
        .map_err(|e| Error::InvalidInput(format!("annotation fields must be strings: {}", e)))?;

    let mut store = state.store.write().await;
    let created = store.create_annotation(draft)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/annotations/:id
///
/// **Request:** `{"annotation": "new text"}`
pub async fn update_annotation(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Annotation>> {
    let id = parse_annotation_id(&raw_id)?;
    let body = parse_json_object(&body)?;
    let text = required_str(&body, "annotation")?;

    let mut store = state.store.write().await;
    Ok(Json(store.update_annotation(id, text)?))
}

/// DELETE /api/annotations/:id
pub async fn delete_annotation(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_annotation_id(&raw_id)?;
    let mut store = state.store.write().await;
    store.delete_annotation(id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_annotation_id() {
        assert_eq!(parse_annotation_id("12").unwrap(), 12);
        assert!(parse_annotation_id("twelve").is_err());
        assert!(parse_annotation_id("-1").is_err());
    }
}
