//! Handlers for enrollment rows: join, drop and listings.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use registrar_core::status::EnrollmentStatus;
use registrar_core::store::EnrollmentRecord;
use registrar_core::types::DbId;
use registrar_db::repositories::EnrollmentRepo;
use registrar_enrollment::JoinOutcome;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{ensure_acts_for, RequireAuth};
use crate::response::DataResponse;
use crate::state::AppState;

/// `?status=` filter; defaults to `Enrolled`.
#[derive(Debug, Deserialize)]
pub struct StatusParams {
    pub status: Option<EnrollmentStatus>,
}

impl StatusParams {
    fn status(&self) -> EnrollmentStatus {
        self.status.unwrap_or(EnrollmentStatus::Enrolled)
    }
}

/// Request body for `POST /users/{id}/enrollments`.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub section: DbId,
}

/// POST /api/v1/users/{id}/enrollments
///
/// Returns the new row with `waitlist_position` set when the section was
/// full and the user was placed on its waitlist.
pub async fn join(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(user_id): Path<DbId>,
    Json(input): Json<JoinRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<JoinOutcome>>)> {
    ensure_acts_for(&user, user_id)?;
    let outcome = state.admission.request_join(user_id, input.section).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

/// DELETE /api/v1/users/{id}/enrollments/{section_id}
pub async fn drop_own(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((user_id, section_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<EnrollmentRecord>>> {
    ensure_acts_for(&user, user_id)?;
    let record = state.admission.drop_enrollment(user_id, section_id).await?;
    Ok(Json(DataResponse { data: record }))
}

/// DELETE /api/v1/sections/{id}/enrollments/{user_id}
///
/// Open to registrars, the section's instructor, and the student themself;
/// the engine checks instructor ownership under the section lock.
pub async fn drop_from_section(
    State(state): State<AppState>,
    user: AuthUser,
    Path((section_id, user_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<EnrollmentRecord>>> {
    let record = state
        .admission
        .drop_section_enrollment(&user.actor(), user_id, section_id)
        .await?;
    Ok(Json(DataResponse { data: record }))
}

/// GET /api/v1/sections/{id}/enrollments?status=
pub async fn list_by_section(
    State(state): State<AppState>,
    Path(section_id): Path<DbId>,
    Query(params): Query<StatusParams>,
) -> AppResult<Json<DataResponse<Vec<EnrollmentRecord>>>> {
    let status = params.status();
    let rows = state
        .read(|pool| async move { EnrollmentRepo::list_by_section(&pool, section_id, status).await })
        .await?;
    Ok(Json(DataResponse { data: rows }))
}

/// GET /api/v1/users/{id}/enrollments?status=
pub async fn list_by_user(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(user_id): Path<DbId>,
    Query(params): Query<StatusParams>,
) -> AppResult<Json<DataResponse<Vec<EnrollmentRecord>>>> {
    ensure_acts_for(&user, user_id)?;
    let status = params.status();
    let rows = state
        .read(|pool| async move { EnrollmentRepo::list_by_user(&pool, user_id, status).await })
        .await?;
    Ok(Json(DataResponse { data: rows }))
}
