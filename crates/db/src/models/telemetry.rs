//! Telemetry record entity.
//!
//! Telemetry rows are immutable once created (no `updated_at`).

use serde::Serialize;
use sqlx::FromRow;
use tailpress_core::types::{DbId, JobId, Timestamp};

/// Cost and caller metadata of one successful compilation.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TelemetryRecord {
    pub id: DbId,
    pub job_id: JobId,
    pub duration_ms: i64,
    pub memory_bytes: i64,
    pub compiler_version: String,
    pub caller_client_name: String,
    pub caller_site_identifier: String,
    pub created_at: Timestamp,
}
