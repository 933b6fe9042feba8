pub mod health;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the public route tree.
///
/// ```text
/// /          GET redirect, POST compile
/// ```
pub fn app_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(handlers::landing::redirect).post(handlers::compile::compile),
    )
}
