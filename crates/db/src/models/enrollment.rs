//! Enrollment entity model.
//!
//! Rows are created only by the admission engine, so there is no create DTO.

use registrar_core::status::{EnrollmentStatus, StatusId};
use registrar_core::store::EnrollmentRecord;
use registrar_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `enrollments` table.
#[derive(Debug, Clone, FromRow)]
pub struct Enrollment {
    pub id: DbId,
    pub user_id: DbId,
    pub section_id: DbId,
    pub status_id: StatusId,
    pub grade: Option<String>,
    pub enrolled_at: Timestamp,
}

impl TryFrom<Enrollment> for EnrollmentRecord {
    type Error = sqlx::Error;

    fn try_from(row: Enrollment) -> Result<Self, Self::Error> {
        let status = EnrollmentStatus::from_id(row.status_id).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown enrollment status_id {}", row.status_id).into())
        })?;
        Ok(EnrollmentRecord {
            id: row.id,
            user_id: row.user_id,
            section_id: row.section_id,
            status,
            grade: row.grade,
            enrolled_at: row.enrolled_at,
        })
    }
}

/// Convert a batch of rows, failing on the first unknown status.
pub fn into_records(rows: Vec<Enrollment>) -> Result<Vec<EnrollmentRecord>, sqlx::Error> {
    rows.into_iter().map(EnrollmentRecord::try_from).collect()
}
