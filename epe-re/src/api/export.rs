//! Export endpoints: JSON download, TEI witness and TEI apparatus

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};

use super::alignments::AlignmentQuery;
use crate::error::ApiResult;
use crate::export::{apparatus_tei, witness_tei};
use crate::AppState;

const TEI_CONTENT_TYPE: &str = "application/tei+xml; charset=utf-8";

/// GET /api/export/:id
///
/// The stored witness record as a JSON download.
pub async fn export_witness_json(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.read().await;
    let witness = store.get_witness(&id)?;
    let body = serde_json::to_vec_pretty(witness).map_err(epe_common::Error::from)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.json\"", super::download_name(&id)),
            ),
        ],
        body,
    ))
}

/// GET /api/export/tei/:id
pub async fn export_witness_tei(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.read().await;
    let witness = store.get_witness(&id)?;
    let annotations = store.list_annotations(Some(&id));
    let body = witness_tei(witness, &annotations);
    Ok(([(header::CONTENT_TYPE, TEI_CONTENT_TYPE)], body))
}

/// GET /api/export/apparatus?base=&witness=
///
/// Same parameters as `/api/alignments`; only variant rows are emitted.
pub async fn export_apparatus(
    State(state): State<AppState>,
    Query(query): Query<AlignmentQuery>,
) -> ApiResult<impl IntoResponse> {
    let request = query.into_request()?;
    let store = state.store.read().await;
    let alignment = store.align(&request)?;
    let base = store.get_witness(&request.base_witness_id)?;
    let other = store.get_witness(&request.other_witness_id)?;
    let body = apparatus_tei(base, other, &alignment);
    Ok(([(header::CONTENT_TYPE, TEI_CONTENT_TYPE)], body))
}
