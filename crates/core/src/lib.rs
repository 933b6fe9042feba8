//! Domain logic for the tailpress compilation service.
//!
//! Everything here is free of HTTP and database concerns: request
//! validation, job workspace materialization, the Tailwind compiler
//! subprocess, and the telemetry sink contract. The `api` crate wires these
//! together with concrete collaborators.

pub mod caller;
pub mod compiler;
pub mod error;
pub mod job;
pub mod storage;
pub mod telemetry;
pub mod types;
pub mod validation;
pub mod workspace;
