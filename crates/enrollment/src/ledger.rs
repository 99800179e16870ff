//! Per-section waitlist positions.
//!
//! Positions are zero-based and contiguous: a section with `k` entries holds
//! exactly `{0, 1, .., k-1}`. Both operations run inside the caller's
//! transaction, after the section lock, so a concurrent append can never
//! compute the same tail position and a removal is never visible without
//! its renumbering.

use registrar_core::store::{StoreError, StoreTx, WaitlistEntry};
use registrar_core::types::DbId;

pub struct WaitlistLedger;

impl WaitlistLedger {
    /// Insert `user_id` at the tail. The new position is the current entry count.
    pub async fn append(
        tx: &mut dyn StoreTx,
        section_id: DbId,
        user_id: DbId,
    ) -> Result<WaitlistEntry, StoreError> {
        let count = tx.count_section_waitlist(section_id).await?;
        let position = i32::try_from(count).map_err(|_| {
            StoreError::Inconsistent(format!("waitlist of section {section_id} has {count} entries"))
        })?;
        let entry = tx.insert_waitlist_entry(user_id, section_id, position).await?;
        tracing::debug!(section_id, user_id, position, "Waitlist entry appended");
        Ok(entry)
    }

    /// Delete the entry at `position` and move every later entry up by one.
    ///
    /// Returns the number of entries renumbered. A missing entry means the
    /// caller read a position that the locked transaction cannot see, which
    /// is reported as [`StoreError::Inconsistent`].
    pub async fn remove_and_compact(
        tx: &mut dyn StoreTx,
        section_id: DbId,
        position: i32,
    ) -> Result<u64, StoreError> {
        if !tx.delete_waitlist_entry(section_id, position).await? {
            return Err(StoreError::Inconsistent(format!(
                "no waitlist entry at position {position} in section {section_id}"
            )));
        }
        let shifted = tx.shift_waitlist_down(section_id, position).await?;
        tracing::debug!(section_id, position, shifted, "Waitlist compacted");
        Ok(shifted)
    }
}
