//! Handlers for the `/courses` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use registrar_core::error::CoreError;
use registrar_core::store::WaitlistEntry;
use registrar_core::types::DbId;
use registrar_db::models::course::{Course, CreateCourse};
use registrar_db::repositories::{CourseRepo, WaitlistRepo};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireRegistrar;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/courses
pub async fn create(
    State(state): State<AppState>,
    RequireRegistrar(user): RequireRegistrar,
    Json(input): Json<CreateCourse>,
) -> AppResult<(StatusCode, Json<DataResponse<Course>>)> {
    input.validate()?;
    let course = CourseRepo::create(&state.pool, &input).await?;
    tracing::info!(course_id = course.id, code = %course.code, by = user.user_id, "Course created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: course })))
}

/// GET /api/v1/courses
pub async fn list(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<Course>>>> {
    let courses = state
        .read(|pool| async move { CourseRepo::list(&pool).await })
        .await?;
    Ok(Json(DataResponse { data: courses }))
}

/// GET /api/v1/courses/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Course>>> {
    let course = find_course(&state, id).await?;
    Ok(Json(DataResponse { data: course }))
}

/// GET /api/v1/courses/{id}/waitlist
///
/// Waitlist entries of every live section of the course, grouped by section
/// and ordered by position.
pub async fn waitlist(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<WaitlistEntry>>>> {
    find_course(&state, id).await?;
    let entries = state
        .read(|pool| async move { WaitlistRepo::list_by_course(&pool, id).await })
        .await?;
    Ok(Json(DataResponse { data: entries }))
}

async fn find_course(state: &AppState, id: DbId) -> AppResult<Course> {
    state
        .read(|pool| async move { CourseRepo::find_by_id(&pool, id).await })
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Course",
            id,
        }))
}
