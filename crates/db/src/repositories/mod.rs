//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod telemetry_repo;

pub use telemetry_repo::TelemetryRepo;
