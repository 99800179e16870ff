//! Route definitions for the `/sections` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{enrollment, section, waitlist};
use crate::state::AppState;

/// Routes mounted at `/sections`.
///
/// ```text
/// GET    /                                -> list
/// POST   /                                -> create
/// GET    /{id}                            -> get_by_id
/// PATCH  /{id}                            -> update
/// DELETE /{id}                            -> delete (cascade)
/// POST   /{id}/reconcile                  -> reconcile
/// GET    /{id}/enrollments                -> enrollment::list_by_section
/// DELETE /{id}/enrollments/{user_id}      -> enrollment::drop_from_section
/// GET    /{id}/waitlist                   -> waitlist::list_by_section
/// POST   /{id}/waitlist/promote           -> waitlist::promote
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(section::list).post(section::create))
        .route(
            "/{id}",
            get(section::get_by_id)
                .patch(section::update)
                .delete(section::delete),
        )
        .route("/{id}/reconcile", post(section::reconcile))
        .route("/{id}/enrollments", get(enrollment::list_by_section))
        .route(
            "/{id}/enrollments/{user_id}",
            delete(enrollment::drop_from_section),
        )
        .route("/{id}/waitlist", get(waitlist::list_by_section))
        .route("/{id}/waitlist/promote", post(waitlist::promote))
}
