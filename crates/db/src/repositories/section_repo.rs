//! Repository for the `sections` table.
//!
//! Soft-deleted sections (`deleted = TRUE`) are hidden from every read
//! except the engine's [`SectionRepo::lock_state`].

use registrar_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::section::{
    CreateSection, Section, SectionStateRow, UpdateSection, UserSectionsFilter,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, course_id, classroom, capacity, waitlist_capacity, day, \
    begin_time, end_time, freeze, deleted, instructor_id, created_at, updated_at";

/// Same column list qualified for joins.
const QUALIFIED_COLUMNS: &str = "s.id, s.course_id, s.classroom, s.capacity, \
    s.waitlist_capacity, s.day, s.begin_time, s.end_time, s.freeze, s.deleted, \
    s.instructor_id, s.created_at, s.updated_at";

/// Provides CRUD and locking operations for sections.
pub struct SectionRepo;

impl SectionRepo {
    // ── Standard CRUD ────────────────────────────────────────────────

    pub async fn create(pool: &PgPool, input: &CreateSection) -> Result<Section, sqlx::Error> {
        let query = format!(
            "INSERT INTO sections
                (course_id, classroom, capacity, waitlist_capacity, day, begin_time,
                 end_time, freeze, instructor_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Section>(&query)
            .bind(input.course_id)
            .bind(&input.classroom)
            .bind(input.capacity)
            .bind(input.waitlist_capacity)
            .bind(&input.day)
            .bind(&input.begin_time)
            .bind(&input.end_time)
            .bind(input.freeze)
            .bind(input.instructor_id)
            .fetch_one(pool)
            .await
    }

    /// Find a live section by id. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Section>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sections WHERE id = $1 AND deleted = FALSE");
        sqlx::query_as::<_, Section>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List live sections, optionally restricted to one course.
    pub async fn list(pool: &PgPool, course_id: Option<DbId>) -> Result<Vec<Section>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sections
             WHERE deleted = FALSE AND ($1::BIGINT IS NULL OR course_id = $1)
             ORDER BY id"
        );
        sqlx::query_as::<_, Section>(&query)
            .bind(course_id)
            .fetch_all(pool)
            .await
    }

    /// Live sections a user is enrolled in (any status) and/or instructs.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        filter: UserSectionsFilter,
    ) -> Result<Vec<Section>, sqlx::Error> {
        let (enrolled, instructing) = match filter {
            UserSectionsFilter::All => (true, true),
            UserSectionsFilter::Enrolled => (true, false),
            UserSectionsFilter::Instructing => (false, true),
        };
        let query = format!(
            "SELECT {QUALIFIED_COLUMNS} FROM sections s
             WHERE s.deleted = FALSE AND (
                ($2 AND EXISTS (
                    SELECT 1 FROM enrollments e
                    WHERE e.section_id = s.id AND e.user_id = $1
                ))
                OR ($3 AND s.instructor_id = $1)
             )
             ORDER BY s.id"
        );
        sqlx::query_as::<_, Section>(&query)
            .bind(user_id)
            .bind(enrolled)
            .bind(instructing)
            .fetch_all(pool)
            .await
    }

    /// Update a live section. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no live row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateSection,
    ) -> Result<Option<Section>, sqlx::Error> {
        let query = format!(
            "UPDATE sections SET
                classroom = COALESCE($2, classroom),
                capacity = COALESCE($3, capacity),
                waitlist_capacity = COALESCE($4, waitlist_capacity),
                day = COALESCE($5, day),
                begin_time = COALESCE($6, begin_time),
                end_time = COALESCE($7, end_time),
                freeze = COALESCE($8, freeze),
                instructor_id = COALESCE($9, instructor_id)
             WHERE id = $1 AND deleted = FALSE
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Section>(&query)
            .bind(id)
            .bind(&input.classroom)
            .bind(input.capacity)
            .bind(input.waitlist_capacity)
            .bind(&input.day)
            .bind(&input.begin_time)
            .bind(&input.end_time)
            .bind(input.freeze)
            .bind(input.instructor_id)
            .fetch_optional(pool)
            .await
    }

    // ── Engine operations (inside a transaction) ─────────────────────

    /// Lock the section row until the transaction ends.
    ///
    /// Returns deleted rows too so the cascade can tell "missing" from
    /// "already deleted".
    pub async fn lock_state(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<SectionStateRow>, sqlx::Error> {
        sqlx::query_as::<_, SectionStateRow>(
            "SELECT id, capacity, waitlist_capacity, freeze, deleted, instructor_id
             FROM sections WHERE id = $1
             FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Soft-delete a section. Returns `true` if the row was live.
    pub async fn mark_deleted(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE sections SET deleted = TRUE WHERE id = $1 AND deleted = FALSE")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
