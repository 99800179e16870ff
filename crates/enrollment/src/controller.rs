//! Admission controller: join, drop, promote and cascade delete.
//!
//! Every operation runs as one storage transaction that starts by locking
//! the section row, re-reads all counts under that lock, and either commits
//! all of its writes or none. Storage contention aborts the attempt and the
//! whole transaction is re-run under the configured [`RetryPolicy`]; logical
//! rejections are returned on the first attempt.
//!
//! Lock order is always section first, then the user's waitlist lock.

use std::future::Future;
use std::sync::Arc;

use registrar_core::admission::{decide, AdmissionDecision, AdmissionSnapshot};
use registrar_core::retry::RetryPolicy;
use registrar_core::roles::Actor;
use registrar_core::status::EnrollmentStatus;
use registrar_core::store::{DataStore, EnrollmentRecord, SectionState, StoreError, StoreTx};
use registrar_core::types::DbId;
use serde::Serialize;

use crate::error::EnrollmentError;
use crate::ledger::WaitlistLedger;

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinOutcome {
    #[serde(flatten)]
    pub enrollment: EnrollmentRecord,
    /// Zero-based waitlist position; `None` for a direct enrollment.
    pub waitlist_position: Option<i32>,
}

/// Rows transitioned by a cascade pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub section_id: DbId,
    pub enrollments_dropped: usize,
    pub waitlist_dropped: usize,
}

/// Which section preconditions an operation enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionAccess {
    /// Section must exist, be live and not frozen.
    Live,
    /// Section must exist; deleted and frozen sections are accepted. Used
    /// only by the cascade that drains a deleted section.
    Cascade,
}

pub struct AdmissionController {
    store: Arc<dyn DataStore>,
    retry: RetryPolicy,
}

impl AdmissionController {
    pub fn new(store: Arc<dyn DataStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    // ── Public operations ────────────────────────────────────────────

    /// Enroll `user_id` in the section, or place them on its waitlist.
    pub async fn request_join(
        &self,
        user_id: DbId,
        section_id: DbId,
    ) -> Result<JoinOutcome, EnrollmentError> {
        let outcome = self
            .with_retry("request_join", move |_| self.join_once(user_id, section_id))
            .await?;
        tracing::info!(
            user_id,
            section_id,
            status = %outcome.enrollment.status,
            position = ?outcome.waitlist_position,
            "Join admitted"
        );
        Ok(outcome)
    }

    /// Move the user's Enrolled row to Dropped.
    ///
    /// Dropping again returns the existing row unchanged. The vacated seat
    /// is not offered to the waitlist; see [`Self::promote_next`].
    pub async fn drop_enrollment(
        &self,
        user_id: DbId,
        section_id: DbId,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        self.with_retry("drop_enrollment", move |_| {
            self.drop_enrollment_once(user_id, section_id, SectionAccess::Live)
        })
        .await
    }

    /// Drop on behalf of `actor`, who must be a registrar, the section's
    /// instructor, or the user themself.
    pub async fn drop_section_enrollment(
        &self,
        actor: &Actor,
        user_id: DbId,
        section_id: DbId,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        self.with_retry("drop_section_enrollment", move |_| {
            self.drop_section_enrollment_once(actor, user_id, section_id)
        })
        .await
    }

    /// Remove the user from the section's waitlist, compact the positions
    /// behind them, and drop their Waitlisted row.
    pub async fn drop_waitlist(
        &self,
        user_id: DbId,
        section_id: DbId,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        let record = self
            .with_retry("drop_waitlist", move |_| {
                self.drop_waitlist_once(user_id, section_id, SectionAccess::Live)
            })
            .await?;
        tracing::info!(user_id, section_id, "Left waitlist");
        Ok(record)
    }

    /// Enroll the head of the waitlist if the section has an open seat.
    ///
    /// Returns `None` when nobody is waiting. Only a registrar or the
    /// section's instructor may promote.
    pub async fn promote_next(
        &self,
        actor: &Actor,
        section_id: DbId,
    ) -> Result<Option<EnrollmentRecord>, EnrollmentError> {
        let promoted = self
            .with_retry("promote_next", move |_| self.promote_once(actor, section_id))
            .await?;
        if let Some(record) = &promoted {
            tracing::info!(user_id = record.user_id, section_id, "Promoted from waitlist");
        }
        Ok(promoted)
    }

    /// Mark the section deleted, then drop every enrollment and waitlist
    /// entry in it through the regular drop paths.
    ///
    /// The deleted flag commits before any drop. If the drain is
    /// interrupted, [`Self::resume_cascade`] finishes it.
    pub async fn cascade_delete_section(
        &self,
        section_id: DbId,
    ) -> Result<CascadeReport, EnrollmentError> {
        self.with_retry("cascade_delete_section", move |_| {
            self.mark_deleted_once(section_id)
        })
        .await?;
        tracing::info!(section_id, "Section marked deleted");
        self.drain_section(section_id).await
    }

    /// Re-run the drops of an interrupted cascade. Safe to repeat.
    pub async fn resume_cascade(&self, section_id: DbId) -> Result<CascadeReport, EnrollmentError> {
        self.with_retry("resume_cascade", move |_| self.ensure_deleted_once(section_id))
            .await?;
        self.drain_section(section_id).await
    }

    // ── Retry and transaction plumbing ───────────────────────────────

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T, EnrollmentError>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, EnrollmentError>>,
    {
        self.retry
            .retry_if(
                |attempt| {
                    if attempt > 0 {
                        tracing::warn!(operation, attempt, "Retrying after storage conflict");
                    }
                    op(attempt)
                },
                EnrollmentError::is_retryable,
            )
            .await
            .map_err(|(err, attempts)| {
                if err.is_retryable() {
                    tracing::error!(operation, attempts, error = %err, "Storage conflict persisted");
                    EnrollmentError::StorageConflict { attempts }
                } else {
                    err
                }
            })
    }

    /// Commit on success, roll back on failure. The operation's own error
    /// wins over a rollback failure.
    async fn finish<T>(
        tx: Box<dyn StoreTx>,
        result: Result<T, EnrollmentError>,
    ) -> Result<T, EnrollmentError> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    // ── Single attempts ──────────────────────────────────────────────

    async fn join_once(&self, user_id: DbId, section_id: DbId) -> Result<JoinOutcome, EnrollmentError> {
        let mut tx = self.store.begin().await?;
        let result = join_in(&mut *tx, user_id, section_id).await;
        Self::finish(tx, result).await
    }

    async fn drop_enrollment_once(
        &self,
        user_id: DbId,
        section_id: DbId,
        access: SectionAccess,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        let mut tx = self.store.begin().await?;
        let result: Result<EnrollmentRecord, EnrollmentError> = async {
            lock_section(&mut *tx, section_id, access).await?;
            drop_enrolled_row(&mut *tx, user_id, section_id).await
        }
        .await;
        Self::finish(tx, result).await
    }

    async fn drop_section_enrollment_once(
        &self,
        actor: &Actor,
        user_id: DbId,
        section_id: DbId,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        let mut tx = self.store.begin().await?;
        let result: Result<EnrollmentRecord, EnrollmentError> = async {
            let section = lock_section(&mut *tx, section_id, SectionAccess::Live).await?;
            if !(actor.acts_for(user_id) || actor.user_id == section.instructor_id) {
                return Err(EnrollmentError::Forbidden(format!(
                    "user {} may not drop user {user_id} from section {section_id}",
                    actor.user_id
                )));
            }
            drop_enrolled_row(&mut *tx, user_id, section_id).await
        }
        .await;
        Self::finish(tx, result).await
    }

    async fn drop_waitlist_once(
        &self,
        user_id: DbId,
        section_id: DbId,
        access: SectionAccess,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        let mut tx = self.store.begin().await?;
        let result: Result<EnrollmentRecord, EnrollmentError> = async {
            lock_section(&mut *tx, section_id, access).await?;
            leave_waitlist(&mut *tx, user_id, section_id).await
        }
        .await;
        Self::finish(tx, result).await
    }

    async fn promote_once(
        &self,
        actor: &Actor,
        section_id: DbId,
    ) -> Result<Option<EnrollmentRecord>, EnrollmentError> {
        let mut tx = self.store.begin().await?;
        let result = promote_in(&mut *tx, actor, section_id).await;
        Self::finish(tx, result).await
    }

    async fn mark_deleted_once(&self, section_id: DbId) -> Result<(), EnrollmentError> {
        let mut tx = self.store.begin().await?;
        let result: Result<(), EnrollmentError> = async {
            match tx.lock_section(section_id).await? {
                Some(section) if !section.deleted => {
                    tx.mark_section_deleted(section_id).await?;
                    Ok(())
                }
                _ => Err(EnrollmentError::SectionNotFound(section_id)),
            }
        }
        .await;
        Self::finish(tx, result).await
    }

    async fn ensure_deleted_once(&self, section_id: DbId) -> Result<(), EnrollmentError> {
        let mut tx = self.store.begin().await?;
        let result: Result<(), EnrollmentError> = async {
            match tx.lock_section(section_id).await? {
                None => Err(EnrollmentError::SectionNotFound(section_id)),
                Some(section) if !section.deleted => {
                    Err(EnrollmentError::SectionNotDeleted(section_id))
                }
                Some(_) => Ok(()),
            }
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Enrolled users and waitlisted users (tail first) of a section.
    async fn cascade_targets_once(
        &self,
        section_id: DbId,
    ) -> Result<(Vec<DbId>, Vec<DbId>), EnrollmentError> {
        let mut tx = self.store.begin().await?;
        let result: Result<(Vec<DbId>, Vec<DbId>), EnrollmentError> = async {
            lock_section(&mut *tx, section_id, SectionAccess::Cascade).await?;
            let enrolled = tx.enrolled_user_ids(section_id).await?;
            let waiting = tx
                .section_waitlist(section_id)
                .await?
                .into_iter()
                .rev()
                .map(|entry| entry.user_id)
                .collect();
            Ok((enrolled, waiting))
        }
        .await;
        Self::finish(tx, result).await
    }

    // ── Cascade ──────────────────────────────────────────────────────

    /// Drop every row of a deleted section, one transaction per user.
    ///
    /// A deleted section accepts no joins, so the target lists cannot grow.
    /// Entries that vanished in the meantime are skipped; any other failure
    /// aborts the pass and can be resumed.
    async fn drain_section(&self, section_id: DbId) -> Result<CascadeReport, EnrollmentError> {
        let (enrolled, waiting) = self
            .with_retry("cascade_targets", move |_| self.cascade_targets_once(section_id))
            .await?;

        let mut report = CascadeReport {
            section_id,
            ..CascadeReport::default()
        };

        for user_id in enrolled {
            self.with_retry("cascade_drop_enrollment", move |_| {
                self.drop_enrollment_once(user_id, section_id, SectionAccess::Cascade)
            })
            .await?;
            report.enrollments_dropped += 1;
        }

        // Tail first so no remaining entry needs renumbering.
        for user_id in waiting {
            match self
                .with_retry("cascade_drop_waitlist", move |_| {
                    self.drop_waitlist_once(user_id, section_id, SectionAccess::Cascade)
                })
                .await
            {
                Ok(_) => report.waitlist_dropped += 1,
                Err(EnrollmentError::NotOnWaitlist { .. }) => {
                    tracing::debug!(user_id, section_id, "Waitlist entry already gone");
                }
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            section_id,
            enrollments_dropped = report.enrollments_dropped,
            waitlist_dropped = report.waitlist_dropped,
            "Section drained"
        );
        Ok(report)
    }
}

// ── Transaction bodies ───────────────────────────────────────────────

async fn lock_section(
    tx: &mut dyn StoreTx,
    section_id: DbId,
    access: SectionAccess,
) -> Result<SectionState, EnrollmentError> {
    let section = tx
        .lock_section(section_id)
        .await?
        .ok_or(EnrollmentError::SectionNotFound(section_id))?;
    if access == SectionAccess::Live {
        if section.deleted {
            return Err(EnrollmentError::SectionNotFound(section_id));
        }
        if section.freeze {
            return Err(EnrollmentError::Frozen(section_id));
        }
    }
    Ok(section)
}

async fn join_in(
    tx: &mut dyn StoreTx,
    user_id: DbId,
    section_id: DbId,
) -> Result<JoinOutcome, EnrollmentError> {
    let section = lock_section(tx, section_id, SectionAccess::Live).await?;

    if let Some(active) = tx.find_active_enrollment(user_id, section_id).await? {
        return Err(EnrollmentError::AlreadyActive {
            user_id,
            section_id,
            status: active.status,
        });
    }

    tx.lock_user_waitlist(user_id).await?;
    let snapshot = AdmissionSnapshot {
        capacity: i64::from(section.capacity),
        enrolled: tx.count_enrolled(section_id).await?,
        waitlist_capacity: i64::from(section.waitlist_capacity),
        section_waitlist: tx.count_section_waitlist(section_id).await?,
        user_waitlist: tx.count_user_waitlist(user_id).await?,
    };

    match decide(&snapshot) {
        AdmissionDecision::Enroll => {
            let enrollment = tx
                .insert_enrollment(user_id, section_id, EnrollmentStatus::Enrolled)
                .await?;
            Ok(JoinOutcome {
                enrollment,
                waitlist_position: None,
            })
        }
        AdmissionDecision::Waitlist { .. } => {
            let entry = WaitlistLedger::append(tx, section_id, user_id).await?;
            let enrollment = tx
                .insert_enrollment(user_id, section_id, EnrollmentStatus::Waitlisted)
                .await?;
            Ok(JoinOutcome {
                enrollment,
                waitlist_position: Some(entry.position),
            })
        }
        AdmissionDecision::Reject(reason) => {
            tracing::info!(user_id, section_id, ?reason, "Join rejected");
            Err(EnrollmentError::CapacityExceeded(reason))
        }
    }
}

/// Shared by every drop of an Enrolled row.
async fn drop_enrolled_row(
    tx: &mut dyn StoreTx,
    user_id: DbId,
    section_id: DbId,
) -> Result<EnrollmentRecord, EnrollmentError> {
    if let Some(active) = tx.find_active_enrollment(user_id, section_id).await? {
        if active.status == EnrollmentStatus::Enrolled {
            let dropped = tx
                .set_enrollment_status(active.id, EnrollmentStatus::Dropped)
                .await?;
            tracing::info!(user_id, section_id, "Enrollment dropped");
            return Ok(dropped);
        }
    }
    let latest = tx
        .latest_enrollment(user_id, section_id)
        .await?
        .ok_or(EnrollmentError::EnrollmentNotFound {
            user_id,
            section_id,
        })?;
    tracing::debug!(user_id, section_id, status = %latest.status, "Nothing to drop");
    Ok(latest)
}

async fn leave_waitlist(
    tx: &mut dyn StoreTx,
    user_id: DbId,
    section_id: DbId,
) -> Result<EnrollmentRecord, EnrollmentError> {
    let entry = tx
        .find_waitlist_entry(user_id, section_id)
        .await?
        .ok_or(EnrollmentError::NotOnWaitlist {
            user_id,
            section_id,
        })?;
    WaitlistLedger::remove_and_compact(tx, section_id, entry.position).await?;
    let record = waitlisted_row(tx, user_id, section_id).await?;
    Ok(tx
        .set_enrollment_status(record.id, EnrollmentStatus::Dropped)
        .await?)
}

async fn promote_in(
    tx: &mut dyn StoreTx,
    actor: &Actor,
    section_id: DbId,
) -> Result<Option<EnrollmentRecord>, EnrollmentError> {
    let section = lock_section(tx, section_id, SectionAccess::Live).await?;
    if !(actor.is_registrar() || actor.user_id == section.instructor_id) {
        return Err(EnrollmentError::Forbidden(format!(
            "user {} may not promote in section {section_id}",
            actor.user_id
        )));
    }

    if tx.count_enrolled(section_id).await? >= i64::from(section.capacity) {
        return Err(EnrollmentError::NoOpenSeat(section_id));
    }
    let Some(head) = tx.waitlist_entry_at(section_id, 0).await? else {
        return Ok(None);
    };

    WaitlistLedger::remove_and_compact(tx, section_id, head.position).await?;
    let record = waitlisted_row(tx, head.user_id, section_id).await?;
    let promoted = tx
        .set_enrollment_status(record.id, EnrollmentStatus::Enrolled)
        .await?;
    Ok(Some(promoted))
}

/// The Waitlisted row that must accompany a waitlist entry.
async fn waitlisted_row(
    tx: &mut dyn StoreTx,
    user_id: DbId,
    section_id: DbId,
) -> Result<EnrollmentRecord, EnrollmentError> {
    tx.find_active_enrollment(user_id, section_id)
        .await?
        .filter(|record| record.status == EnrollmentStatus::Waitlisted)
        .ok_or_else(|| {
            StoreError::Inconsistent(format!(
                "waitlist entry without Waitlisted row for user {user_id} in section {section_id}"
            ))
            .into()
        })
}
