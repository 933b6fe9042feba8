use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
    /// Whether the compiler binary is present and executable.
    pub compiler_ready: bool,
}

/// GET /health -- returns service, database and compiler health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = tailpress_db::health_check(&state.pool).await.is_ok();
    let compiler_ready = state.jobs.compiler().preflight().await.is_ok();

    let status = if db_healthy && compiler_ready {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        compiler_ready,
    })
}

/// Mount health check routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
