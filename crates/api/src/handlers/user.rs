//! Handlers for `/users/{id}/sections`.

use axum::extract::{Path, Query, State};
use axum::Json;
use registrar_core::types::DbId;
use registrar_db::models::section::{Section, UserSectionsFilter};
use registrar_db::repositories::SectionRepo;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::rbac::{ensure_acts_for, RequireAuth};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UserSectionsParams {
    #[serde(rename = "type", default)]
    pub filter: UserSectionsFilter,
}

/// GET /api/v1/users/{id}/sections?type=all|enrolled|instructing
pub async fn sections(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(user_id): Path<DbId>,
    Query(params): Query<UserSectionsParams>,
) -> AppResult<Json<DataResponse<Vec<Section>>>> {
    ensure_acts_for(&user, user_id)?;
    let filter = params.filter;
    let sections = state
        .read(|pool| async move { SectionRepo::list_for_user(&pool, user_id, filter).await })
        .await?;
    Ok(Json(DataResponse { data: sections }))
}
