//! Route definitions for per-user resources under `/users/{id}`.
//!
//! Every route is open to the user themself and to registrars.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::{enrollment, user, waitlist};
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET    /{id}/enrollments                -> enrollment::list_by_user
/// POST   /{id}/enrollments                -> enrollment::join
/// DELETE /{id}/enrollments/{section_id}   -> enrollment::drop_own
/// GET    /{id}/sections                   -> user::sections
/// GET    /{id}/waitlist                   -> waitlist::list_by_user
/// DELETE /{id}/waitlist/{section_id}      -> waitlist::leave
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}/enrollments",
            get(enrollment::list_by_user).post(enrollment::join),
        )
        .route(
            "/{id}/enrollments/{section_id}",
            delete(enrollment::drop_own),
        )
        .route("/{id}/sections", get(user::sections))
        .route("/{id}/waitlist", get(waitlist::list_by_user))
        .route("/{id}/waitlist/{section_id}", delete(waitlist::leave))
}
