use std::sync::Arc;

use tailpress_core::job::JobHandler;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: tailpress_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Compilation pipeline with its storage, compiler and telemetry sink.
    pub jobs: Arc<JobHandler>,
}
