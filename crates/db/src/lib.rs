//! PostgreSQL persistence for the registrar service.
//!
//! - [`models`] -- `FromRow` entity structs and request DTOs.
//! - [`repositories`] -- zero-sized repos with async query methods.
//! - [`store`] -- [`store::PgDataStore`], the engine's transactional store.

use std::time::Duration;

use registrar_core::store::StoreError;
use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;
pub mod store;

pub type DbPool = sqlx::PgPool;

/// Default connection limit per pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// How long a request waits for a pooled connection before failing over.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
}

/// Create a pool that connects on first use.
///
/// Used for read replicas so one unreachable replica does not block startup;
/// the replica router fails over when it is queried.
pub fn create_lazy_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_lazy(database_url)
}

/// Round-trip a trivial query to verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}

/// PostgreSQL SQLSTATE codes that signal benign contention.
///
/// - `40001` serialization_failure
/// - `40P01` deadlock_detected
/// - `55P03` lock_not_available
const CONFLICT_CODES: &[&str] = &["40001", "40P01", "55P03"];

/// Returns `true` if the error means the replica itself is unusable
/// (connection refused, pool exhausted or closed) rather than the query
/// being wrong. Such errors justify trying the next replica.
pub fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

/// Classify a sqlx error for the admission engine.
///
/// Contention codes and violations of the active-enrollment unique index
/// become [`StoreError::Conflict`] so the engine re-runs the transaction and
/// re-reads current state. Everything else is a backend failure.
pub fn classify_store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let code = db_err.code();
        if code.as_deref().is_some_and(|c| CONFLICT_CODES.contains(&c)) {
            return StoreError::Conflict(db_err.message().to_string());
        }
        if code.as_deref() == Some("23505") && db_err.constraint() == Some("uq_enrollments_active") {
            return StoreError::Conflict(db_err.message().to_string());
        }
    }
    tracing::error!(error = %err, "Store query failed");
    StoreError::Backend(err.to_string())
}
