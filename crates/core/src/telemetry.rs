//! Telemetry sink contract.
//!
//! One [`NewTelemetryRecord`] is produced per successful compilation. Where
//! it ends up is the sink's business: the API either inserts it inline or
//! hands it to a background writer through a [`QueuedTelemetrySink`].

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::types::JobId;

/// Cost and caller metadata of one completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTelemetryRecord {
    pub job_id: JobId,
    pub duration_ms: i64,
    pub memory_bytes: i64,
    pub compiler_version: String,
    pub caller_client_name: String,
    pub caller_site_identifier: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("telemetry persistence failed: {0}")]
    Database(String),

    #[error("telemetry queue is full")]
    QueueFull,

    #[error("telemetry queue is closed")]
    QueueClosed,
}

/// Destination for telemetry records.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn record(&self, record: NewTelemetryRecord) -> Result<(), TelemetryError>;
}

/// Sink that enqueues records onto a bounded channel without waiting.
#[derive(Debug, Clone)]
pub struct QueuedTelemetrySink {
    sender: mpsc::Sender<NewTelemetryRecord>,
}

impl QueuedTelemetrySink {
    /// Create a sink and the receiver a background writer drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<NewTelemetryRecord>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl TelemetrySink for QueuedTelemetrySink {
    async fn record(&self, record: NewTelemetryRecord) -> Result<(), TelemetryError> {
        self.sender.try_send(record).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TelemetryError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => TelemetryError::QueueClosed,
        })
    }
}
