//! Handler for compile requests.
//!
//! The body is read as raw bytes so a malformed payload produces the
//! `{status: "error"}` envelope instead of axum's plain-text rejection.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::Json;
use tailpress_core::validation::BuildRequest;

use crate::error::{AppError, AppResult};
use crate::response::CompileResponse;
use crate::state::AppState;

pub const MALFORMED_BODY: &str = "The request body must be a JSON object.";

/// POST /
///
/// Validate the submitted fields, compile them in a fresh workspace and
/// return the generated stylesheet.
pub async fn compile(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<CompileResponse>> {
    let mut request = parse_body(&body)?;
    request.caller_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let job = state.jobs.handle(&request).await?;

    tracing::info!(job_id = %job.job_id, css_bytes = job.css.len(), "Compile request served");

    Ok(Json(CompileResponse::from(job)))
}

/// An empty body is an empty object, so every field reports as missing.
fn parse_body(body: &[u8]) -> AppResult<BuildRequest> {
    let malformed = || AppError::BadRequest(MALFORMED_BODY.to_string());

    match body.iter().copied().find(|b| !b.is_ascii_whitespace()) {
        None => return Ok(BuildRequest::default()),
        // Derived struct deserializers also accept arrays.
        Some(b'{') => {}
        Some(_) => return Err(malformed()),
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected malformed compile body");
        malformed()
    })
}
