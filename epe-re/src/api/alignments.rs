//! Alignment endpoints: compute, list groups, import groups

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use epe_common::{AlignmentGroup, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::alignment::{Alignment, AlignmentRequest};
use crate::error::ApiResult;
use crate::AppState;

/// Query parameters naming the two witnesses (and optionally sections)
#[derive(Debug, Default, Deserialize)]
pub struct AlignmentQuery {
    pub base: Option<String>,
    pub witness: Option<String>,
    pub base_section: Option<String>,
    pub witness_section: Option<String>,
}

impl AlignmentQuery {
    pub fn into_request(self) -> ApiResult<AlignmentRequest> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        match (non_empty(self.base), non_empty(self.witness)) {
            (Some(base), Some(witness)) => Ok(AlignmentRequest::new(base, witness)
                .with_sections(non_empty(self.base_section), non_empty(self.witness_section))),
            _ => Err(Error::InvalidInput("Missing base or witness id".to_string()).into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub groups: usize,
}

/// GET /api/alignments?base=&witness=&base_section=&witness_section=
pub async fn get_alignment(
    State(state): State<AppState>,
    Query(query): Query<AlignmentQuery>,
) -> ApiResult<Json<Alignment>> {
    let request = query.into_request()?;
    let store = state.store.read().await;
    let alignment = store.align(&request)?;
    debug!(
        "Aligned {} against {}: {} rows, {} variants ({:?})",
        request.base_witness_id,
        request.other_witness_id,
        alignment.alignments.len(),
        alignment.variant_count(),
        alignment.mode
    );
    Ok(Json(alignment))
}

/// GET /api/alignments/groups
pub async fn list_alignment_groups(State(state): State<AppState>) -> Json<Vec<AlignmentGroup>> {
    let store = state.store.read().await;
    Json(store.alignment_groups().to_vec())
}

/// POST /api/alignments/import
///
/// Body is the raw CSV/TSV table. Replaces every stored group.
pub async fn import_alignment_groups(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ImportResponse>)> {
    let mut store = state.store.write().await;
    let groups = store.import_alignment_table(&body)?;
    info!("Imported {} alignment groups ({} bytes)", groups, body.len());
    Ok((StatusCode::CREATED, Json(ImportResponse { groups })))
}
