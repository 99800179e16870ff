pub mod courses;
pub mod health;
pub mod sections;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /courses                                  list, create (registrar)
/// /courses/{id}                             get
/// /courses/{id}/waitlist                    waitlists of the course's sections
///
/// /sections                                 list (?course_id=), create (registrar)
/// /sections/{id}                            get, update, cascade delete (registrar)
/// /sections/{id}/reconcile                  finish an interrupted cascade (registrar)
/// /sections/{id}/enrollments                list (?status=)
/// /sections/{id}/enrollments/{user_id}      drop (registrar, instructor, self)
/// /sections/{id}/waitlist                   list
/// /sections/{id}/waitlist/promote           enroll the head (registrar, instructor)
///
/// /users/{id}/enrollments                   list (?status=), join
/// /users/{id}/enrollments/{section_id}      drop
/// /users/{id}/sections                      list (?type=all|enrolled|instructing)
/// /users/{id}/waitlist                      list
/// /users/{id}/waitlist/{section_id}         leave
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/courses", courses::router())
        .nest("/sections", sections::router())
        .nest("/users", users::router())
}
