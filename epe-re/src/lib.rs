//! epe-re library - Reading Environment service
//!
//! Witness transcriptions, annotations and alignment groups behind a JSON
//! HTTP API, persisted as JSON documents in a data folder.

use axum::Router;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub mod alignment;
pub mod api;
pub mod error;
pub mod export;
pub mod import;
pub mod store;

use store::RecordStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Record store; handlers take the write lock for every mutation
    pub store: Arc<RwLock<RecordStore>>,
    /// Log file served by `/api/logs` (None when file logging is off)
    pub log_file: Option<PathBuf>,
    /// Folder served for non-API paths
    pub static_dir: Option<PathBuf>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(store: RecordStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            log_file: None,
            static_dir: None,
            startup_time: epe_common::time::now(),
        }
    }

    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    pub fn with_static_dir(mut self, path: Option<PathBuf>) -> Self {
        self.static_dir = path;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post, put};

    let static_dir = state.static_dir.clone();

    let routes = Router::new()
        .route(
            "/api/witnesses",
            get(api::list_witnesses).post(api::create_witness),
        )
        .route(
            "/api/witnesses/:id",
            get(api::get_witness)
                .put(api::update_witness_label)
                .patch(api::update_witness_label)
                .delete(api::delete_witness),
        )
        .route(
            "/api/annotations",
            get(api::list_annotations).post(api::create_annotation),
        )
        .route(
            "/api/annotations/:id",
            put(api::update_annotation).delete(api::delete_annotation),
        )
        .route("/api/alignments", get(api::get_alignment))
        .route("/api/alignments/groups", get(api::list_alignment_groups))
        .route("/api/alignments/import", post(api::import_alignment_groups))
        .route("/api/export/:id", get(api::export_witness_json))
        .route("/api/export/tei/:id", get(api::export_witness_tei))
        .route("/api/export/apparatus", get(api::export_apparatus))
        .route("/api/logs", get(api::get_logs))
        .route("/api/logs/export", get(api::export_logs));

    let mut app = Router::new()
        .merge(routes)
        .merge(api::health_routes())
        .with_state(state);

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
