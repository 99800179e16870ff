use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use registrar_core::admission::RejectReason;
use registrar_core::error::CoreError;
use registrar_enrollment::EnrollmentError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`EnrollmentError`] for domain errors and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A rejection or failure from the admission engine.
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::Validation(err.to_string()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Admission engine ---
            AppError::Enrollment(err) => classify_enrollment_error(err),

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Map an engine error to an HTTP status, error code, and message.
///
/// Capacity rejections and precondition failures are conflicts with the
/// section's current state (409). Persistent contention is transient and
/// reported as 503 so clients may re-issue the request.
fn classify_enrollment_error(err: &EnrollmentError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        EnrollmentError::SectionNotFound(_) | EnrollmentError::EnrollmentNotFound { .. } => {
            (StatusCode::NOT_FOUND, "NOT_FOUND", message)
        }
        EnrollmentError::NotOnWaitlist { .. } => {
            (StatusCode::BAD_REQUEST, "NOT_ON_WAITLIST", message)
        }
        EnrollmentError::AlreadyActive { .. } => (StatusCode::CONFLICT, "ALREADY_ACTIVE", message),
        EnrollmentError::CapacityExceeded(reason) => {
            let code = match reason {
                RejectReason::WaitlistFull => "WAITLIST_FULL",
                RejectReason::WaitlistQuotaReached => "WAITLIST_QUOTA_REACHED",
            };
            (StatusCode::CONFLICT, code, message)
        }
        EnrollmentError::Frozen(_) => (StatusCode::CONFLICT, "SECTION_FROZEN", message),
        EnrollmentError::NoOpenSeat(_) => (StatusCode::CONFLICT, "NO_OPEN_SEAT", message),
        EnrollmentError::SectionNotDeleted(_) => {
            (StatusCode::CONFLICT, "SECTION_NOT_DELETED", message)
        }
        EnrollmentError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN", message),
        EnrollmentError::StorageConflict { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_CONFLICT", message)
        }
        EnrollmentError::Store(store) => {
            tracing::error!(error = %store, "Admission storage failure");
            internal()
        }
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Foreign key violations map to 400.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            match db_err.code().as_deref() {
                Some("23505") if constraint.starts_with("uq_") => {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
                Some("23503") => {
                    return (
                        StatusCode::BAD_REQUEST,
                        "BAD_REQUEST",
                        format!("Referenced row does not exist: {constraint}"),
                    );
                }
                _ => {}
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
