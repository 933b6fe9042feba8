/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Unique identifier of a compilation job (random, version 4).
pub type JobId = uuid::Uuid;
