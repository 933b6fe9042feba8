//! Repository for the `telemetry_records` table.

use sqlx::PgPool;
use tailpress_core::telemetry::NewTelemetryRecord;
use tailpress_core::types::JobId;

use crate::models::telemetry::TelemetryRecord;

/// Column list for `telemetry_records` SELECT queries.
const COLUMNS: &str = "\
    id, job_id, duration_ms, memory_bytes, compiler_version, \
    caller_client_name, caller_site_identifier, created_at";

/// Insert and lookup for telemetry records. Rows are never updated or
/// deleted through this repository.
pub struct TelemetryRepo;

impl TelemetryRepo {
    /// Insert one record, returning the stored row.
    pub async fn insert(
        pool: &PgPool,
        input: &NewTelemetryRecord,
    ) -> Result<TelemetryRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO telemetry_records \
                (job_id, duration_ms, memory_bytes, compiler_version, \
                 caller_client_name, caller_site_identifier) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, TelemetryRecord>(&query)
            .bind(input.job_id)
            .bind(input.duration_ms)
            .bind(input.memory_bytes)
            .bind(&input.compiler_version)
            .bind(&input.caller_client_name)
            .bind(&input.caller_site_identifier)
            .fetch_one(pool)
            .await?;

        tracing::debug!(
            id = row.id,
            job_id = %row.job_id,
            duration_ms = row.duration_ms,
            memory_bytes = row.memory_bytes,
            "Inserted telemetry record"
        );
        Ok(row)
    }

    /// Find the record of a job, if one was written.
    pub async fn find_by_job_id(
        pool: &PgPool,
        job_id: JobId,
    ) -> Result<Option<TelemetryRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM telemetry_records WHERE job_id = $1");
        sqlx::query_as::<_, TelemetryRecord>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// Total number of stored records.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM telemetry_records")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}
