//! Domain model structs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row. Create DTOs live in `tailpress_core` when the domain
//! layer produces them.

pub mod telemetry;
