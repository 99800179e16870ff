//! Repository for the `waitlist_entries` table.
//!
//! Positions are zero-based and contiguous per section. Only the engine's
//! ledger writes here, always inside a transaction holding the section lock.

use registrar_core::store::WaitlistEntry;
use registrar_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::waitlist::WaitlistRow;

/// Column list for `waitlist_entries` queries.
const COLUMNS: &str = "id, user_id, section_id, position, joined_at";

/// Same column list qualified for joins.
const QUALIFIED_COLUMNS: &str = "w.id, w.user_id, w.section_id, w.position, w.joined_at";

/// Provides listing and ledger operations for waitlist entries.
pub struct WaitlistRepo;

impl WaitlistRepo {
    // ── Listing ──────────────────────────────────────────────────────

    /// Waitlist of a live section ordered by position.
    pub async fn list_by_section(
        pool: &PgPool,
        section_id: DbId,
    ) -> Result<Vec<WaitlistEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {QUALIFIED_COLUMNS} FROM waitlist_entries w
             INNER JOIN sections s ON s.id = w.section_id
             WHERE w.section_id = $1 AND s.deleted = FALSE
             ORDER BY w.position"
        );
        let rows = sqlx::query_as::<_, WaitlistRow>(&query)
            .bind(section_id)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(WaitlistEntry::from).collect())
    }

    /// Waitlist entries across every live section of a course.
    pub async fn list_by_course(
        pool: &PgPool,
        course_id: DbId,
    ) -> Result<Vec<WaitlistEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {QUALIFIED_COLUMNS} FROM waitlist_entries w
             INNER JOIN sections s ON s.id = w.section_id
             WHERE s.course_id = $1 AND s.deleted = FALSE
             ORDER BY w.section_id, w.position"
        );
        let rows = sqlx::query_as::<_, WaitlistRow>(&query)
            .bind(course_id)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(WaitlistEntry::from).collect())
    }

    /// Entries where the user is waiting, plus entries on sections the user
    /// instructs.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<WaitlistEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {QUALIFIED_COLUMNS} FROM waitlist_entries w
             INNER JOIN sections s ON s.id = w.section_id
             WHERE s.deleted = FALSE AND (w.user_id = $1 OR s.instructor_id = $1)
             ORDER BY w.section_id, w.position"
        );
        let rows = sqlx::query_as::<_, WaitlistRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(WaitlistEntry::from).collect())
    }

    // ── Engine operations (inside a transaction) ─────────────────────

    /// Take a transaction-scoped advisory lock keyed on the user id.
    ///
    /// Serializes the per-user quota check across sections. Acquired after
    /// the section row lock, never before, so lock order is global.
    pub async fn lock_user(conn: &mut PgConnection, user_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn count_by_section(conn: &mut PgConnection, section_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM waitlist_entries WHERE section_id = $1")
            .bind(section_id)
            .fetch_one(conn)
            .await?;
        Ok(row.0)
    }

    pub async fn count_by_user(conn: &mut PgConnection, user_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM waitlist_entries WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(conn)
            .await?;
        Ok(row.0)
    }

    pub async fn find(
        conn: &mut PgConnection,
        user_id: DbId,
        section_id: DbId,
    ) -> Result<Option<WaitlistEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM waitlist_entries WHERE user_id = $1 AND section_id = $2"
        );
        let row = sqlx::query_as::<_, WaitlistRow>(&query)
            .bind(user_id)
            .bind(section_id)
            .fetch_optional(conn)
            .await?;
        Ok(row.map(WaitlistEntry::from))
    }

    pub async fn find_at(
        conn: &mut PgConnection,
        section_id: DbId,
        position: i32,
    ) -> Result<Option<WaitlistEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM waitlist_entries WHERE section_id = $1 AND position = $2"
        );
        let row = sqlx::query_as::<_, WaitlistRow>(&query)
            .bind(section_id)
            .bind(position)
            .fetch_optional(conn)
            .await?;
        Ok(row.map(WaitlistEntry::from))
    }

    pub async fn insert(
        conn: &mut PgConnection,
        user_id: DbId,
        section_id: DbId,
        position: i32,
    ) -> Result<WaitlistEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO waitlist_entries (user_id, section_id, position)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, WaitlistRow>(&query)
            .bind(user_id)
            .bind(section_id)
            .bind(position)
            .fetch_one(conn)
            .await?;
        Ok(WaitlistEntry::from(row))
    }

    /// Delete the entry at `position`. Returns `true` if a row was removed.
    pub async fn delete_at(
        conn: &mut PgConnection,
        section_id: DbId,
        position: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM waitlist_entries WHERE section_id = $1 AND position = $2")
            .bind(section_id)
            .bind(position)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Close the gap left at `removed_position`.
    pub async fn shift_down(
        conn: &mut PgConnection,
        section_id: DbId,
        removed_position: i32,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE waitlist_entries SET position = position - 1
             WHERE section_id = $1 AND position > $2",
        )
        .bind(section_id)
        .bind(removed_position)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// All entries of a section ordered by position (no deleted filter).
    pub async fn entries_for_section(
        conn: &mut PgConnection,
        section_id: DbId,
    ) -> Result<Vec<WaitlistEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM waitlist_entries WHERE section_id = $1 ORDER BY position"
        );
        let rows = sqlx::query_as::<_, WaitlistRow>(&query)
            .bind(section_id)
            .fetch_all(conn)
            .await?;
        Ok(rows.into_iter().map(WaitlistEntry::from).collect())
    }
}
