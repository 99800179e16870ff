//! In-process [`DataStore`] used by the engine and HTTP test suites.
//!
//! All tables sit behind one async mutex. A transaction holds the guard from
//! `begin` until it ends and mutates a private working copy, so commit is a
//! swap and a dropped transaction leaves the shared tables untouched.
//!
//! Faults can be armed per [`StoreOp`] to simulate contention or backend
//! failures at a precise point of an engine operation.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use registrar_core::status::EnrollmentStatus;
use registrar_core::store::{
    DataStore, EnrollmentRecord, SectionState, StoreError, StoreTx, WaitlistEntry,
};
use registrar_core::types::DbId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Store operations that can have a fault armed against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Begin,
    LockSection,
    MarkSectionDeleted,
    CountEnrolled,
    FindActiveEnrollment,
    LatestEnrollment,
    InsertEnrollment,
    SetEnrollmentStatus,
    EnrolledUserIds,
    LockUserWaitlist,
    CountSectionWaitlist,
    CountUserWaitlist,
    FindWaitlistEntry,
    WaitlistEntryAt,
    InsertWaitlistEntry,
    DeleteWaitlistEntry,
    ShiftWaitlistDown,
    SectionWaitlist,
    Commit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Fails with [`StoreError::Conflict`], which the engine retries.
    Conflict,
    /// Fails with [`StoreError::Backend`], which aborts the operation.
    Backend,
}

#[derive(Debug)]
struct Fault {
    op: StoreOp,
    kind: FaultKind,
    remaining: usize,
}

#[derive(Debug, Default)]
struct FaultPlan {
    faults: Vec<Fault>,
}

impl FaultPlan {
    fn trip(&mut self, op: StoreOp) -> Option<StoreError> {
        let fault = self
            .faults
            .iter_mut()
            .find(|f| f.op == op && f.remaining > 0)?;
        fault.remaining -= 1;
        let message = format!("injected fault at {op:?}");
        Some(match fault.kind {
            FaultKind::Conflict => StoreError::Conflict(message),
            FaultKind::Backend => StoreError::Backend(message),
        })
    }
}

/// Committed contents of an [`InMemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub sections: BTreeMap<DbId, SectionState>,
    pub enrollments: Vec<EnrollmentRecord>,
    pub waitlist: Vec<WaitlistEntry>,
    next_enrollment_id: DbId,
    next_waitlist_id: DbId,
}

impl Tables {
    pub fn section(&self, section_id: DbId) -> Option<&SectionState> {
        self.sections.get(&section_id)
    }

    /// Every row for the pair, oldest first.
    pub fn enrollments_for(&self, user_id: DbId, section_id: DbId) -> Vec<&EnrollmentRecord> {
        self.enrollments
            .iter()
            .filter(|e| e.user_id == user_id && e.section_id == section_id)
            .collect()
    }

    pub fn count_status(&self, section_id: DbId, status: EnrollmentStatus) -> usize {
        self.enrollments
            .iter()
            .filter(|e| e.section_id == section_id && e.status == status)
            .count()
    }

    /// Sorted positions of the section's waitlist.
    pub fn waitlist_positions(&self, section_id: DbId) -> Vec<i32> {
        let mut positions: Vec<i32> = self
            .waitlist
            .iter()
            .filter(|w| w.section_id == section_id)
            .map(|w| w.position)
            .collect();
        positions.sort_unstable();
        positions
    }

    /// Waiting users in position order.
    pub fn waitlist_users(&self, section_id: DbId) -> Vec<DbId> {
        let mut entries: Vec<&WaitlistEntry> = self
            .waitlist
            .iter()
            .filter(|w| w.section_id == section_id)
            .collect();
        entries.sort_by_key(|w| w.position);
        entries.into_iter().map(|w| w.user_id).collect()
    }

    pub fn user_waitlist_count(&self, user_id: DbId) -> usize {
        self.waitlist.iter().filter(|w| w.user_id == user_id).count()
    }

    fn active_index(&self, user_id: DbId, section_id: DbId) -> Option<usize> {
        self.enrollments.iter().position(|e| {
            e.user_id == user_id && e.section_id == section_id && e.status.is_active()
        })
    }
}

/// Process-local store with serializable transactions.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<AsyncMutex<Tables>>,
    faults: Arc<Mutex<FaultPlan>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a section.
    pub async fn insert_section(&self, section: SectionState) {
        self.tables.lock().await.sections.insert(section.id, section);
    }

    /// A copy of the committed tables. Waits for any open transaction.
    pub async fn snapshot(&self) -> Tables {
        self.tables.lock().await.clone()
    }

    /// Fail the next `times` calls of `op` with `kind`.
    pub fn fail_next(&self, op: StoreOp, kind: FaultKind, times: usize) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .faults
            .push(Fault {
                op,
                kind,
                remaining: times,
            });
    }

    /// Disarm all pending faults.
    pub fn clear_faults(&self) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .faults
            .clear();
    }
}

fn trip(faults: &Mutex<FaultPlan>, op: StoreOp) -> Result<(), StoreError> {
    match faults.lock().unwrap_or_else(PoisonError::into_inner).trip(op) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[async_trait]
impl DataStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        trip(&self.faults, StoreOp::Begin)?;
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            faults: Arc::clone(&self.faults),
        }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    faults: Arc<Mutex<FaultPlan>>,
}

impl MemoryTx {
    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        trip(&self.faults, op)
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_section(&mut self, section_id: DbId) -> Result<Option<SectionState>, StoreError> {
        self.check(StoreOp::LockSection)?;
        Ok(self.working.sections.get(&section_id).cloned())
    }

    async fn mark_section_deleted(&mut self, section_id: DbId) -> Result<bool, StoreError> {
        self.check(StoreOp::MarkSectionDeleted)?;
        match self.working.sections.get_mut(&section_id) {
            Some(section) if !section.deleted => {
                section.deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_enrolled(&mut self, section_id: DbId) -> Result<i64, StoreError> {
        self.check(StoreOp::CountEnrolled)?;
        Ok(self.working.count_status(section_id, EnrollmentStatus::Enrolled) as i64)
    }

    async fn find_active_enrollment(
        &mut self,
        user_id: DbId,
        section_id: DbId,
    ) -> Result<Option<EnrollmentRecord>, StoreError> {
        self.check(StoreOp::FindActiveEnrollment)?;
        Ok(self
            .working
            .active_index(user_id, section_id)
            .map(|i| self.working.enrollments[i].clone()))
    }

    async fn latest_enrollment(
        &mut self,
        user_id: DbId,
        section_id: DbId,
    ) -> Result<Option<EnrollmentRecord>, StoreError> {
        self.check(StoreOp::LatestEnrollment)?;
        Ok(self
            .working
            .enrollments_for(user_id, section_id)
            .into_iter()
            .max_by_key(|e| e.id)
            .cloned())
    }

    async fn insert_enrollment(
        &mut self,
        user_id: DbId,
        section_id: DbId,
        status: EnrollmentStatus,
    ) -> Result<EnrollmentRecord, StoreError> {
        self.check(StoreOp::InsertEnrollment)?;
        if status.is_active() && self.working.active_index(user_id, section_id).is_some() {
            return Err(StoreError::Conflict(format!(
                "active enrollment already exists for user {user_id} in section {section_id}"
            )));
        }
        self.working.next_enrollment_id += 1;
        let record = EnrollmentRecord {
            id: self.working.next_enrollment_id,
            user_id,
            section_id,
            status,
            grade: None,
            enrolled_at: Utc::now(),
        };
        self.working.enrollments.push(record.clone());
        Ok(record)
    }

    async fn set_enrollment_status(
        &mut self,
        enrollment_id: DbId,
        status: EnrollmentStatus,
    ) -> Result<EnrollmentRecord, StoreError> {
        self.check(StoreOp::SetEnrollmentStatus)?;
        let record = self
            .working
            .enrollments
            .iter_mut()
            .find(|e| e.id == enrollment_id)
            .ok_or_else(|| StoreError::Backend(format!("enrollment {enrollment_id} not found")))?;
        record.status = status;
        Ok(record.clone())
    }

    async fn enrolled_user_ids(&mut self, section_id: DbId) -> Result<Vec<DbId>, StoreError> {
        self.check(StoreOp::EnrolledUserIds)?;
        Ok(self
            .working
            .enrollments
            .iter()
            .filter(|e| e.section_id == section_id && e.status == EnrollmentStatus::Enrolled)
            .map(|e| e.user_id)
            .collect())
    }

    async fn lock_user_waitlist(&mut self, _user_id: DbId) -> Result<(), StoreError> {
        // The table guard already serializes every transaction.
        self.check(StoreOp::LockUserWaitlist)
    }

    async fn count_section_waitlist(&mut self, section_id: DbId) -> Result<i64, StoreError> {
        self.check(StoreOp::CountSectionWaitlist)?;
        Ok(self.working.waitlist_positions(section_id).len() as i64)
    }

    async fn count_user_waitlist(&mut self, user_id: DbId) -> Result<i64, StoreError> {
        self.check(StoreOp::CountUserWaitlist)?;
        Ok(self.working.user_waitlist_count(user_id) as i64)
    }

    async fn find_waitlist_entry(
        &mut self,
        user_id: DbId,
        section_id: DbId,
    ) -> Result<Option<WaitlistEntry>, StoreError> {
        self.check(StoreOp::FindWaitlistEntry)?;
        Ok(self
            .working
            .waitlist
            .iter()
            .find(|w| w.user_id == user_id && w.section_id == section_id)
            .cloned())
    }

    async fn waitlist_entry_at(
        &mut self,
        section_id: DbId,
        position: i32,
    ) -> Result<Option<WaitlistEntry>, StoreError> {
        self.check(StoreOp::WaitlistEntryAt)?;
        Ok(self
            .working
            .waitlist
            .iter()
            .find(|w| w.section_id == section_id && w.position == position)
            .cloned())
    }

    async fn insert_waitlist_entry(
        &mut self,
        user_id: DbId,
        section_id: DbId,
        position: i32,
    ) -> Result<WaitlistEntry, StoreError> {
        self.check(StoreOp::InsertWaitlistEntry)?;
        if self
            .working
            .waitlist
            .iter()
            .any(|w| w.user_id == user_id && w.section_id == section_id)
        {
            return Err(StoreError::Backend(format!(
                "user {user_id} already waits on section {section_id}"
            )));
        }
        self.working.next_waitlist_id += 1;
        let entry = WaitlistEntry {
            id: self.working.next_waitlist_id,
            user_id,
            section_id,
            position,
            joined_at: Utc::now(),
        };
        self.working.waitlist.push(entry.clone());
        Ok(entry)
    }

    async fn delete_waitlist_entry(
        &mut self,
        section_id: DbId,
        position: i32,
    ) -> Result<bool, StoreError> {
        self.check(StoreOp::DeleteWaitlistEntry)?;
        let before = self.working.waitlist.len();
        self.working
            .waitlist
            .retain(|w| !(w.section_id == section_id && w.position == position));
        Ok(self.working.waitlist.len() < before)
    }

    async fn shift_waitlist_down(
        &mut self,
        section_id: DbId,
        removed_position: i32,
    ) -> Result<u64, StoreError> {
        self.check(StoreOp::ShiftWaitlistDown)?;
        let mut shifted = 0;
        for entry in self
            .working
            .waitlist
            .iter_mut()
            .filter(|w| w.section_id == section_id && w.position > removed_position)
        {
            entry.position -= 1;
            shifted += 1;
        }
        Ok(shifted)
    }

    async fn section_waitlist(&mut self, section_id: DbId) -> Result<Vec<WaitlistEntry>, StoreError> {
        self.check(StoreOp::SectionWaitlist)?;
        let mut entries: Vec<WaitlistEntry> = self
            .working
            .waitlist
            .iter()
            .filter(|w| w.section_id == section_id)
            .cloned()
            .collect();
        entries.sort_by_key(|w| w.position);
        Ok(entries)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.check(StoreOp::Commit)?;
        let MemoryTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
