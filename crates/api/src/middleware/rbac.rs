//! Role-based access control (RBAC) extractors and ownership checks.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use registrar_core::error::CoreError;
use registrar_core::roles::ROLE_REGISTRAR;
use registrar_core::types::DbId;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `registrar` role. Rejects with 403 Forbidden otherwise.
pub struct RequireRegistrar(pub AuthUser);

impl FromRequestParts<AppState> for RequireRegistrar {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.roles.iter().any(|r| r == ROLE_REGISTRAR) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Registrar role required".into(),
            )));
        }
        Ok(RequireRegistrar(user))
    }
}

/// Requires any authenticated user.
///
/// Functionally equivalent to [`AuthUser`] but named explicitly for route
/// handlers where "this route requires authentication" should read clearly.
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        Ok(RequireAuth(user))
    }
}

/// Per-user resources (`/users/{id}/...`) are open to that user and to
/// registrars.
pub fn ensure_acts_for(user: &AuthUser, user_id: DbId) -> Result<(), AppError> {
    if user.actor().acts_for(user_id) {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden("Not authorized".into())))
    }
}
