use std::future::Future;
use std::sync::Arc;

use registrar_core::replica::ReplicaRouter;
use registrar_db::DbPool;
use registrar_enrollment::AdmissionController;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything heavy sits behind an `Arc` or is a pool handle.
#[derive(Clone)]
pub struct AppState {
    /// Read-write primary pool (catalog writes, health checks).
    pub pool: DbPool,
    /// Round-robin over read replicas for listing endpoints.
    pub replicas: Arc<ReplicaRouter<DbPool>>,
    /// Admission engine over the primary.
    pub admission: Arc<AdmissionController>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Run a read-only query on the next replica, failing over to the
    /// others on connection-level errors.
    pub async fn read<F, Fut, T>(&self, query: F) -> Result<T, sqlx::Error>
    where
        F: FnMut(DbPool) -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        self.replicas
            .with_failover(query, registrar_db::is_connection_error)
            .await
    }
}
