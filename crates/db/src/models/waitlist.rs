//! Waitlist entry model.

use registrar_core::store::WaitlistEntry;
use registrar_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `waitlist_entries` table.
#[derive(Debug, Clone, FromRow)]
pub struct WaitlistRow {
    pub id: DbId,
    pub user_id: DbId,
    pub section_id: DbId,
    pub position: i32,
    pub joined_at: Timestamp,
}

impl From<WaitlistRow> for WaitlistEntry {
    fn from(row: WaitlistRow) -> Self {
        WaitlistEntry {
            id: row.id,
            user_id: row.user_id,
            section_id: row.section_id,
            position: row.position,
            joined_at: row.joined_at,
        }
    }
}
