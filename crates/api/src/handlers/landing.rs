use axum::extract::State;
use axum::response::Redirect;

use crate::state::AppState;

/// GET /
///
/// Browsers landing on the service are sent to the configured site.
pub async fn redirect(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(&state.config.redirect_url)
}
