//! Response envelopes.
//!
//! Every response to `POST /` carries a `status` of `"success"` or
//! `"error"`. Use these types instead of ad-hoc `json!` bodies.

use serde::Serialize;
use tailpress_core::job::CompiledJob;
use uuid::Uuid;

/// `{ "status": "success", "uuid": ..., "css": ... }`
#[derive(Debug, Serialize)]
pub struct CompileResponse {
    pub status: &'static str,
    pub uuid: Uuid,
    pub css: String,
}

impl From<CompiledJob> for CompileResponse {
    fn from(job: CompiledJob) -> Self {
        Self {
            status: "success",
            uuid: job.job_id,
            css: job.css,
        }
    }
}

/// `{ "status": "error", "errors": ... }`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub errors: String,
}

impl ErrorResponse {
    pub fn new(errors: impl Into<String>) -> Self {
        Self {
            status: "error",
            errors: errors.into(),
        }
    }
}
