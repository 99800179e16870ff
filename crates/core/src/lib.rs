//! Registrar core: shared types, error taxonomy, and the pure pieces of the
//! admission engine.
//!
//! Lives below every other crate and has no internal dependencies, so the
//! storage layer, the engine, and the HTTP server all speak the same types.

pub mod admission;
pub mod error;
pub mod replica;
pub mod retry;
pub mod roles;
pub mod status;
pub mod store;
pub mod types;
