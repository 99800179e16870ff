//! Admission and waitlist engine.
//!
//! - [`controller::AdmissionController`] -- join, drop, promote and cascade
//!   delete, each executed as one locked storage transaction with bounded
//!   retry on contention.
//! - [`ledger::WaitlistLedger`] -- tail append and remove-with-compaction of
//!   a section's zero-based waitlist positions.
//! - [`memory::InMemoryStore`] -- a [`registrar_core::store::DataStore`]
//!   held in process memory, with fault injection.

pub mod controller;
pub mod error;
pub mod ledger;
pub mod memory;

pub use controller::{AdmissionController, CascadeReport, JoinOutcome};
pub use error::EnrollmentError;
pub use ledger::WaitlistLedger;
pub use memory::InMemoryStore;
