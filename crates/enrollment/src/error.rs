//! Engine error taxonomy.

use registrar_core::admission::RejectReason;
use registrar_core::status::EnrollmentStatus;
use registrar_core::store::StoreError;
use registrar_core::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    /// The section does not exist or is soft-deleted.
    #[error("Section {0} not found")]
    SectionNotFound(DbId),

    #[error("User {user_id} has no enrollment in section {section_id}")]
    EnrollmentNotFound { user_id: DbId, section_id: DbId },

    #[error("User {user_id} is not on the waitlist for section {section_id}")]
    NotOnWaitlist { user_id: DbId, section_id: DbId },

    /// The pair already has an Enrolled or Waitlisted row.
    #[error("User {user_id} is already {status} in section {section_id}")]
    AlreadyActive {
        user_id: DbId,
        section_id: DbId,
        status: EnrollmentStatus,
    },

    #[error("{0}")]
    CapacityExceeded(RejectReason),

    #[error("Section {0} is frozen")]
    Frozen(DbId),

    /// Promotion was requested but every seat is taken.
    #[error("Section {0} has no open seat")]
    NoOpenSeat(DbId),

    /// A cascade recovery pass was requested for a live section.
    #[error("Section {0} is not deleted")]
    SectionNotDeleted(DbId),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Contention persisted through every retry.
    #[error("Storage conflict persisted after {attempts} attempts")]
    StorageConflict { attempts: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EnrollmentError {
    /// Only storage contention is worth re-running a transaction for.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EnrollmentError::Store(err) if err.is_conflict())
    }
}
