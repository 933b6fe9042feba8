//! Deferred telemetry persistence.
//!
//! Drains the queue fed by [`QueuedTelemetrySink`] and writes each record to
//! `telemetry_records`. Failed inserts are logged and dropped. The loop ends
//! when every sender is gone and the queue is empty, which makes shutdown a
//! matter of dropping the application state and awaiting this task.
//!
//! [`QueuedTelemetrySink`]: tailpress_core::telemetry::QueuedTelemetrySink

use tailpress_core::telemetry::NewTelemetryRecord;
use tailpress_db::repositories::TelemetryRepo;
use tailpress_db::DbPool;
use tokio::sync::mpsc;

/// Run the writer loop until the queue closes.
pub async fn run(pool: DbPool, mut receiver: mpsc::Receiver<NewTelemetryRecord>) {
    tracing::info!("Telemetry writer started");

    let mut written = 0u64;
    let mut failed = 0u64;

    while let Some(record) = receiver.recv().await {
        match TelemetryRepo::insert(&pool, &record).await {
            Ok(row) => {
                written += 1;
                tracing::debug!(job_id = %row.job_id, id = row.id, "Telemetry recorded");
            }
            Err(e) => {
                failed += 1;
                tracing::error!(
                    job_id = %record.job_id,
                    error = %e,
                    "Failed to persist telemetry"
                );
            }
        }
    }

    tracing::info!(written, failed, "Telemetry queue closed, writer shutting down");
}
