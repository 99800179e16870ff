//! Repository for the `enrollments` table.
//!
//! Uses `EnrollmentStatus` from `registrar_core::status` for every status
//! literal bound into a query.

use registrar_core::status::EnrollmentStatus;
use registrar_core::store::EnrollmentRecord;
use registrar_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::enrollment::{into_records, Enrollment};

/// Column list for `enrollments` queries.
const COLUMNS: &str = "id, user_id, section_id, status_id, grade, enrolled_at";

/// Provides listing and engine-side operations for enrollments.
pub struct EnrollmentRepo;

impl EnrollmentRepo {
    // ── Listing ──────────────────────────────────────────────────────

    /// Enrollments of a live section with the given status, oldest first.
    pub async fn list_by_section(
        pool: &PgPool,
        section_id: DbId,
        status: EnrollmentStatus,
    ) -> Result<Vec<EnrollmentRecord>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Enrollment>(
            "SELECT e.id, e.user_id, e.section_id, e.status_id, e.grade, e.enrolled_at
             FROM enrollments e
             INNER JOIN sections s ON s.id = e.section_id
             WHERE e.section_id = $1 AND e.status_id = $2 AND s.deleted = FALSE
             ORDER BY e.enrolled_at, e.id",
        )
        .bind(section_id)
        .bind(status.id())
        .fetch_all(pool)
        .await?;
        into_records(rows)
    }

    /// A user's enrollments in live sections with the given status.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
        status: EnrollmentStatus,
    ) -> Result<Vec<EnrollmentRecord>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Enrollment>(
            "SELECT e.id, e.user_id, e.section_id, e.status_id, e.grade, e.enrolled_at
             FROM enrollments e
             INNER JOIN sections s ON s.id = e.section_id
             WHERE e.user_id = $1 AND e.status_id = $2 AND s.deleted = FALSE
             ORDER BY e.enrolled_at, e.id",
        )
        .bind(user_id)
        .bind(status.id())
        .fetch_all(pool)
        .await?;
        into_records(rows)
    }

    // ── Engine operations (inside a transaction) ─────────────────────

    pub async fn count_enrolled(conn: &mut PgConnection, section_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM enrollments WHERE section_id = $1 AND status_id = $2",
        )
        .bind(section_id)
        .bind(EnrollmentStatus::Enrolled.id())
        .fetch_one(conn)
        .await?;
        Ok(row.0)
    }

    /// The Enrolled or Waitlisted row for the pair, if any.
    pub async fn find_active(
        conn: &mut PgConnection,
        user_id: DbId,
        section_id: DbId,
    ) -> Result<Option<EnrollmentRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM enrollments
             WHERE user_id = $1 AND section_id = $2 AND status_id IN ($3, $4)"
        );
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(user_id)
            .bind(section_id)
            .bind(EnrollmentStatus::Enrolled.id())
            .bind(EnrollmentStatus::Waitlisted.id())
            .fetch_optional(conn)
            .await?
            .map(EnrollmentRecord::try_from)
            .transpose()
    }

    /// The newest row for the pair regardless of status.
    pub async fn find_latest(
        conn: &mut PgConnection,
        user_id: DbId,
        section_id: DbId,
    ) -> Result<Option<EnrollmentRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM enrollments
             WHERE user_id = $1 AND section_id = $2
             ORDER BY id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(user_id)
            .bind(section_id)
            .fetch_optional(conn)
            .await?
            .map(EnrollmentRecord::try_from)
            .transpose()
    }

    pub async fn insert(
        conn: &mut PgConnection,
        user_id: DbId,
        section_id: DbId,
        status: EnrollmentStatus,
    ) -> Result<EnrollmentRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO enrollments (user_id, section_id, status_id, grade)
             VALUES ($1, $2, $3, NULL)
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, Enrollment>(&query)
            .bind(user_id)
            .bind(section_id)
            .bind(status.id())
            .fetch_one(conn)
            .await?;
        EnrollmentRecord::try_from(row)
    }

    /// Move a row to `status`. Fails with `RowNotFound` if the id is unknown.
    pub async fn set_status(
        conn: &mut PgConnection,
        enrollment_id: DbId,
        status: EnrollmentStatus,
    ) -> Result<EnrollmentRecord, sqlx::Error> {
        let query = format!(
            "UPDATE enrollments SET status_id = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, Enrollment>(&query)
            .bind(enrollment_id)
            .bind(status.id())
            .fetch_one(conn)
            .await?;
        EnrollmentRecord::try_from(row)
    }

    /// User ids currently Enrolled in the section.
    pub async fn enrolled_user_ids(
        conn: &mut PgConnection,
        section_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT user_id FROM enrollments
             WHERE section_id = $1 AND status_id = $2
             ORDER BY id",
        )
        .bind(section_id)
        .bind(EnrollmentStatus::Enrolled.id())
        .fetch_all(conn)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
