//! Handlers for waitlist entries.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use registrar_core::store::{EnrollmentRecord, WaitlistEntry};
use registrar_core::types::DbId;
use registrar_db::repositories::WaitlistRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{ensure_acts_for, RequireAuth};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/sections/{id}/waitlist
pub async fn list_by_section(
    State(state): State<AppState>,
    Path(section_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<WaitlistEntry>>>> {
    let entries = state
        .read(|pool| async move { WaitlistRepo::list_by_section(&pool, section_id).await })
        .await?;
    Ok(Json(DataResponse { data: entries }))
}

/// GET /api/v1/users/{id}/waitlist
///
/// Entries the user is waiting on, plus the waitlists of sections they
/// instruct.
pub async fn list_by_user(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(user_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<WaitlistEntry>>>> {
    ensure_acts_for(&user, user_id)?;
    let entries = state
        .read(|pool| async move { WaitlistRepo::list_for_user(&pool, user_id).await })
        .await?;
    Ok(Json(DataResponse { data: entries }))
}

/// DELETE /api/v1/users/{id}/waitlist/{section_id}
pub async fn leave(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((user_id, section_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    ensure_acts_for(&user, user_id)?;
    state.admission.drop_waitlist(user_id, section_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sections/{id}/waitlist/promote
///
/// Enrolls the head of the waitlist into an open seat. `data` is `null`
/// when nobody is waiting.
pub async fn promote(
    State(state): State<AppState>,
    user: AuthUser,
    Path(section_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Option<EnrollmentRecord>>>> {
    let promoted = state.admission.promote_next(&user.actor(), section_id).await?;
    Ok(Json(DataResponse { data: promoted }))
}
