//! Tailpress HTTP server library.
//!
//! Exposes config, state, error handling, routes and the background
//! telemetry writer so integration tests and the binary entrypoint can both
//! reach them.

pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod telemetry;
