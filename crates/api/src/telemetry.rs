//! Telemetry sinks backed by Postgres.
//!
//! [`build_sink`] picks the sink for the configured [`TelemetryMode`]. In
//! deferred mode it also spawns the background writer; the writer exits once
//! every sink clone is dropped.

use std::sync::Arc;

use async_trait::async_trait;
use tailpress_core::telemetry::{
    NewTelemetryRecord, QueuedTelemetrySink, TelemetryError, TelemetrySink,
};
use tailpress_db::repositories::TelemetryRepo;
use tailpress_db::DbPool;
use tokio::task::JoinHandle;

use crate::background;
use crate::config::{TelemetryConfig, TelemetryMode};

/// Inserts each record before returning.
#[derive(Debug, Clone)]
pub struct PgTelemetrySink {
    pool: DbPool,
}

impl PgTelemetrySink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TelemetrySink for PgTelemetrySink {
    async fn record(&self, record: NewTelemetryRecord) -> Result<(), TelemetryError> {
        let row = TelemetryRepo::insert(&self.pool, &record)
            .await
            .map_err(|e| TelemetryError::Database(e.to_string()))?;
        tracing::debug!(job_id = %row.job_id, id = row.id, "Telemetry recorded");
        Ok(())
    }
}

/// Build the sink for `config`, spawning the writer task in deferred mode.
pub fn build_sink(
    config: &TelemetryConfig,
    pool: DbPool,
) -> (Arc<dyn TelemetrySink>, Option<JoinHandle<()>>) {
    match config.mode {
        TelemetryMode::Inline => (Arc::new(PgTelemetrySink::new(pool)), None),
        TelemetryMode::Deferred => {
            let (sink, receiver) = QueuedTelemetrySink::channel(config.queue_capacity);
            let handle = tokio::spawn(background::telemetry_writer::run(pool, receiver));
            (Arc::new(sink), Some(handle))
        }
    }
}
