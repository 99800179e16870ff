//! Handlers for the `/sections` resource.
//!
//! Reads and static-field CRUD go straight to the repositories. Deletion
//! goes through the admission engine so every enrollment and waitlist entry
//! is dropped through the regular drop paths.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use registrar_core::error::CoreError;
use registrar_core::types::DbId;
use registrar_db::models::section::{CreateSection, Section, UpdateSection};
use registrar_db::repositories::SectionRepo;
use registrar_enrollment::CascadeReport;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireRegistrar;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListSectionsParams {
    pub course_id: Option<DbId>,
}

/// GET /api/v1/sections?course_id=
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListSectionsParams>,
) -> AppResult<Json<DataResponse<Vec<Section>>>> {
    let course_id = params.course_id;
    let sections = state
        .read(|pool| async move { SectionRepo::list(&pool, course_id).await })
        .await?;
    Ok(Json(DataResponse { data: sections }))
}

/// POST /api/v1/sections
pub async fn create(
    State(state): State<AppState>,
    RequireRegistrar(user): RequireRegistrar,
    Json(input): Json<CreateSection>,
) -> AppResult<(StatusCode, Json<DataResponse<Section>>)> {
    input.validate()?;
    let section = SectionRepo::create(&state.pool, &input).await?;
    tracing::info!(section_id = section.id, course_id = section.course_id, by = user.user_id, "Section created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: section })))
}

/// GET /api/v1/sections/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Section>>> {
    let section = state
        .read(|pool| async move { SectionRepo::find_by_id(&pool, id).await })
        .await?
        .ok_or(section_not_found(id))?;
    Ok(Json(DataResponse { data: section }))
}

/// PATCH /api/v1/sections/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireRegistrar(user): RequireRegistrar,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateSection>,
) -> AppResult<Json<DataResponse<Section>>> {
    if input.is_empty() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }
    input.validate()?;
    let section = SectionRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(section_not_found(id))?;
    tracing::info!(section_id = id, by = user.user_id, "Section updated");
    Ok(Json(DataResponse { data: section }))
}

/// DELETE /api/v1/sections/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireRegistrar(user): RequireRegistrar,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<CascadeReport>>> {
    tracing::info!(section_id = id, by = user.user_id, "Deleting section");
    let report = state.admission.cascade_delete_section(id).await?;
    Ok(Json(DataResponse { data: report }))
}

/// POST /api/v1/sections/{id}/reconcile
///
/// Finish an interrupted cascade for an already deleted section.
pub async fn reconcile(
    State(state): State<AppState>,
    RequireRegistrar(_): RequireRegistrar,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<CascadeReport>>> {
    let report = state.admission.resume_cascade(id).await?;
    Ok(Json(DataResponse { data: report }))
}

fn section_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Section",
        id,
    })
}
