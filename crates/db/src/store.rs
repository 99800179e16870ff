//! PostgreSQL implementation of the engine's [`DataStore`] contract.
//!
//! Each [`StoreTx`] wraps one `sqlx::Transaction` on the primary pool at the
//! default READ COMMITTED level. Serialization comes from explicit locks:
//! `SELECT ... FOR UPDATE` on the section row and an advisory lock on the
//! user for the quota gate. Every count runs after those locks in its own
//! statement, so it sees all previously committed rows.
//!
//! A transaction dropped without `commit` is rolled back by sqlx.

use async_trait::async_trait;
use registrar_core::status::EnrollmentStatus;
use registrar_core::store::{
    DataStore, EnrollmentRecord, SectionState, StoreError, StoreTx, WaitlistEntry,
};
use registrar_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::classify_store_error;
use crate::repositories::{EnrollmentRepo, SectionRepo, WaitlistRepo};

/// Transactional store backed by the read-write primary.
#[derive(Clone)]
pub struct PgDataStore {
    pool: PgPool,
}

impl PgDataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataStore for PgDataStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self.pool.begin().await.map_err(classify_store_error)?;
        Ok(Box::new(PgStoreTx { tx }))
    }
}

/// One open transaction on the primary.
pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn lock_section(&mut self, section_id: DbId) -> Result<Option<SectionState>, StoreError> {
        let row = SectionRepo::lock_state(&mut *self.tx, section_id)
            .await
            .map_err(classify_store_error)?;
        Ok(row.map(SectionState::from))
    }

    async fn mark_section_deleted(&mut self, section_id: DbId) -> Result<bool, StoreError> {
        SectionRepo::mark_deleted(&mut *self.tx, section_id)
            .await
            .map_err(classify_store_error)
    }

    async fn count_enrolled(&mut self, section_id: DbId) -> Result<i64, StoreError> {
        EnrollmentRepo::count_enrolled(&mut *self.tx, section_id)
            .await
            .map_err(classify_store_error)
    }

    async fn find_active_enrollment(
        &mut self,
        user_id: DbId,
        section_id: DbId,
    ) -> Result<Option<EnrollmentRecord>, StoreError> {
        EnrollmentRepo::find_active(&mut *self.tx, user_id, section_id)
            .await
            .map_err(classify_store_error)
    }

    async fn latest_enrollment(
        &mut self,
        user_id: DbId,
        section_id: DbId,
    ) -> Result<Option<EnrollmentRecord>, StoreError> {
        EnrollmentRepo::find_latest(&mut *self.tx, user_id, section_id)
            .await
            .map_err(classify_store_error)
    }

    async fn insert_enrollment(
        &mut self,
        user_id: DbId,
        section_id: DbId,
        status: EnrollmentStatus,
    ) -> Result<EnrollmentRecord, StoreError> {
        EnrollmentRepo::insert(&mut *self.tx, user_id, section_id, status)
            .await
            .map_err(classify_store_error)
    }

    async fn set_enrollment_status(
        &mut self,
        enrollment_id: DbId,
        status: EnrollmentStatus,
    ) -> Result<EnrollmentRecord, StoreError> {
        EnrollmentRepo::set_status(&mut *self.tx, enrollment_id, status)
            .await
            .map_err(classify_store_error)
    }

    async fn enrolled_user_ids(&mut self, section_id: DbId) -> Result<Vec<DbId>, StoreError> {
        EnrollmentRepo::enrolled_user_ids(&mut *self.tx, section_id)
            .await
            .map_err(classify_store_error)
    }

    async fn lock_user_waitlist(&mut self, user_id: DbId) -> Result<(), StoreError> {
        WaitlistRepo::lock_user(&mut *self.tx, user_id)
            .await
            .map_err(classify_store_error)
    }

    async fn count_section_waitlist(&mut self, section_id: DbId) -> Result<i64, StoreError> {
        WaitlistRepo::count_by_section(&mut *self.tx, section_id)
            .await
            .map_err(classify_store_error)
    }

    async fn count_user_waitlist(&mut self, user_id: DbId) -> Result<i64, StoreError> {
        WaitlistRepo::count_by_user(&mut *self.tx, user_id)
            .await
            .map_err(classify_store_error)
    }

    async fn find_waitlist_entry(
        &mut self,
        user_id: DbId,
        section_id: DbId,
    ) -> Result<Option<WaitlistEntry>, StoreError> {
        WaitlistRepo::find(&mut *self.tx, user_id, section_id)
            .await
            .map_err(classify_store_error)
    }

    async fn waitlist_entry_at(
        &mut self,
        section_id: DbId,
        position: i32,
    ) -> Result<Option<WaitlistEntry>, StoreError> {
        WaitlistRepo::find_at(&mut *self.tx, section_id, position)
            .await
            .map_err(classify_store_error)
    }

    async fn insert_waitlist_entry(
        &mut self,
        user_id: DbId,
        section_id: DbId,
        position: i32,
    ) -> Result<WaitlistEntry, StoreError> {
        WaitlistRepo::insert(&mut *self.tx, user_id, section_id, position)
            .await
            .map_err(classify_store_error)
    }

    async fn delete_waitlist_entry(&mut self, section_id: DbId, position: i32) -> Result<bool, StoreError> {
        WaitlistRepo::delete_at(&mut *self.tx, section_id, position)
            .await
            .map_err(classify_store_error)
    }

    async fn shift_waitlist_down(
        &mut self,
        section_id: DbId,
        removed_position: i32,
    ) -> Result<u64, StoreError> {
        WaitlistRepo::shift_down(&mut *self.tx, section_id, removed_position)
            .await
            .map_err(classify_store_error)
    }

    async fn section_waitlist(&mut self, section_id: DbId) -> Result<Vec<WaitlistEntry>, StoreError> {
        WaitlistRepo::entries_for_section(&mut *self.tx, section_id)
            .await
            .map_err(classify_store_error)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(classify_store_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(classify_store_error)
    }
}
