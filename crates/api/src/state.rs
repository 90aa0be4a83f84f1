use std::sync::Arc;

use reliquary_pipeline::AnnotationStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: reliquary_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Annotation store; carries the process-wide encryption decision.
    pub store: Arc<AnnotationStore>,
}
