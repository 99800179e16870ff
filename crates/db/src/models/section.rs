//! Section entity model and DTOs.

use registrar_core::store::SectionState;
use registrar_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Waitlist capacity applied when a new section does not specify one.
pub const DEFAULT_WAITLIST_CAPACITY: i32 = 15;

/// A row from the `sections` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Section {
    pub id: DbId,
    pub course_id: DbId,
    pub classroom: String,
    pub capacity: i32,
    pub waitlist_capacity: i32,
    pub day: String,
    pub begin_time: String,
    pub end_time: String,
    pub freeze: bool,
    pub deleted: bool,
    pub instructor_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Section {
    /// The admission-relevant projection of this row.
    pub fn state(&self) -> SectionState {
        SectionState {
            id: self.id,
            capacity: self.capacity,
            waitlist_capacity: self.waitlist_capacity,
            freeze: self.freeze,
            deleted: self.deleted,
            instructor_id: self.instructor_id,
        }
    }
}

/// The columns read under `FOR UPDATE` by the admission engine.
#[derive(Debug, Clone, FromRow)]
pub struct SectionStateRow {
    pub id: DbId,
    pub capacity: i32,
    pub waitlist_capacity: i32,
    pub freeze: bool,
    pub deleted: bool,
    pub instructor_id: DbId,
}

impl From<SectionStateRow> for SectionState {
    fn from(row: SectionStateRow) -> Self {
        SectionState {
            id: row.id,
            capacity: row.capacity,
            waitlist_capacity: row.waitlist_capacity,
            freeze: row.freeze,
            deleted: row.deleted,
            instructor_id: row.instructor_id,
        }
    }
}

fn default_waitlist_capacity() -> i32 {
    DEFAULT_WAITLIST_CAPACITY
}

/// DTO for creating a new section.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSection {
    pub course_id: DbId,
    #[validate(length(min = 1))]
    pub classroom: String,
    #[validate(range(min = 0))]
    pub capacity: i32,
    #[serde(default = "default_waitlist_capacity")]
    #[validate(range(min = 0))]
    pub waitlist_capacity: i32,
    #[validate(length(min = 1))]
    pub day: String,
    #[validate(length(min = 1))]
    pub begin_time: String,
    #[validate(length(min = 1))]
    pub end_time: String,
    #[serde(default)]
    pub freeze: bool,
    pub instructor_id: DbId,
}

/// DTO for updating a section. All fields optional; `deleted` is not
/// editable here (see the cascade delete).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSection {
    #[validate(length(min = 1))]
    pub classroom: Option<String>,
    #[validate(range(min = 0))]
    pub capacity: Option<i32>,
    #[validate(range(min = 0))]
    pub waitlist_capacity: Option<i32>,
    #[validate(length(min = 1))]
    pub day: Option<String>,
    #[validate(length(min = 1))]
    pub begin_time: Option<String>,
    #[validate(length(min = 1))]
    pub end_time: Option<String>,
    pub freeze: Option<bool>,
    pub instructor_id: Option<DbId>,
}

impl UpdateSection {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.classroom.is_none()
            && self.capacity.is_none()
            && self.waitlist_capacity.is_none()
            && self.day.is_none()
            && self.begin_time.is_none()
            && self.end_time.is_none()
            && self.freeze.is_none()
            && self.instructor_id.is_none()
    }
}

/// Which sections `GET /users/{id}/sections` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserSectionsFilter {
    #[default]
    All,
    Enrolled,
    Instructing,
}
