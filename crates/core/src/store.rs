//! Storage contract consumed by the admission engine.
//!
//! The engine never talks SQL. It opens a [`StoreTx`] through a
//! [`DataStore`], performs typed reads and writes, and commits. Dropping a
//! transaction without committing must roll it back, so a cancelled or
//! timed-out request leaves no partial effect.
//!
//! Every mutating engine transaction starts with [`StoreTx::lock_section`];
//! implementations must hold that lock until commit or rollback so that the
//! count-then-insert sequence is serialized per section.

use async_trait::async_trait;
use serde::Serialize;

use crate::status::EnrollmentStatus;
use crate::types::{DbId, Timestamp};

/// Section fields the engine needs to make admission decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionState {
    pub id: DbId,
    pub capacity: i32,
    pub waitlist_capacity: i32,
    pub freeze: bool,
    pub deleted: bool,
    pub instructor_id: DbId,
}

/// One row of the `enrollments` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollmentRecord {
    pub id: DbId,
    pub user_id: DbId,
    pub section_id: DbId,
    pub status: EnrollmentStatus,
    pub grade: Option<String>,
    pub enrolled_at: Timestamp,
}

/// One row of the `waitlist_entries` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitlistEntry {
    pub id: DbId,
    pub user_id: DbId,
    pub section_id: DbId,
    pub position: i32,
    pub joined_at: Timestamp,
}

/// Failure reported by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Benign contention (serialization failure, deadlock, lock timeout).
    /// The whole transaction may be retried.
    #[error("Storage conflict: {0}")]
    Conflict(String),

    /// Any other backend failure. Not retried.
    #[error("Storage failure: {0}")]
    Backend(String),

    /// The store contradicted an invariant the engine relies on.
    #[error("Storage inconsistency: {0}")]
    Inconsistent(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Opens transactions against the authoritative (read-write) store.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;
}

/// A single open transaction.
#[async_trait]
pub trait StoreTx: Send {
    // ── Sections ─────────────────────────────────────────────────────

    /// Lock the section row until the transaction ends and return its
    /// current state. Returns deleted sections too; `None` only when no
    /// row exists.
    async fn lock_section(&mut self, section_id: DbId) -> Result<Option<SectionState>, StoreError>;

    /// Set `deleted = true`. Returns `false` if the section was already deleted.
    async fn mark_section_deleted(&mut self, section_id: DbId) -> Result<bool, StoreError>;

    // ── Enrollments ──────────────────────────────────────────────────

    async fn count_enrolled(&mut self, section_id: DbId) -> Result<i64, StoreError>;

    /// The Enrolled or Waitlisted row for the pair, if any.
    async fn find_active_enrollment(
        &mut self,
        user_id: DbId,
        section_id: DbId,
    ) -> Result<Option<EnrollmentRecord>, StoreError>;

    /// The most recently created row for the pair regardless of status.
    async fn latest_enrollment(
        &mut self,
        user_id: DbId,
        section_id: DbId,
    ) -> Result<Option<EnrollmentRecord>, StoreError>;

    async fn insert_enrollment(
        &mut self,
        user_id: DbId,
        section_id: DbId,
        status: EnrollmentStatus,
    ) -> Result<EnrollmentRecord, StoreError>;

    async fn set_enrollment_status(
        &mut self,
        enrollment_id: DbId,
        status: EnrollmentStatus,
    ) -> Result<EnrollmentRecord, StoreError>;

    /// User ids holding an Enrolled row in the section.
    async fn enrolled_user_ids(&mut self, section_id: DbId) -> Result<Vec<DbId>, StoreError>;

    // ── Waitlist ─────────────────────────────────────────────────────

    /// Serialize quota checks for one user across all sections. Must be
    /// taken after the section lock.
    async fn lock_user_waitlist(&mut self, user_id: DbId) -> Result<(), StoreError>;

    async fn count_section_waitlist(&mut self, section_id: DbId) -> Result<i64, StoreError>;

    async fn count_user_waitlist(&mut self, user_id: DbId) -> Result<i64, StoreError>;

    async fn find_waitlist_entry(
        &mut self,
        user_id: DbId,
        section_id: DbId,
    ) -> Result<Option<WaitlistEntry>, StoreError>;

    async fn waitlist_entry_at(
        &mut self,
        section_id: DbId,
        position: i32,
    ) -> Result<Option<WaitlistEntry>, StoreError>;

    async fn insert_waitlist_entry(
        &mut self,
        user_id: DbId,
        section_id: DbId,
        position: i32,
    ) -> Result<WaitlistEntry, StoreError>;

    /// Delete the entry at `position`. Returns `false` if there was none.
    async fn delete_waitlist_entry(
        &mut self,
        section_id: DbId,
        position: i32,
    ) -> Result<bool, StoreError>;

    /// Decrement every position greater than `removed_position`. Returns
    /// the number of entries moved.
    async fn shift_waitlist_down(
        &mut self,
        section_id: DbId,
        removed_position: i32,
    ) -> Result<u64, StoreError>;

    /// The section's waitlist ordered by position.
    async fn section_waitlist(&mut self, section_id: DbId) -> Result<Vec<WaitlistEntry>, StoreError>;

    // ── Lifecycle ────────────────────────────────────────────────────

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
