use registrar_core::retry::RetryPolicy;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the database URL and JWT secret have defaults suitable
/// for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long in-flight requests may drain after a shutdown signal.
    pub shutdown_timeout_secs: u64,
    /// Read-write primary. Every admission decision goes here.
    pub database_url: String,
    /// Read-only replicas for listing endpoints. Empty means reads use the
    /// primary.
    pub read_replica_urls: Vec<String>,
    /// Connection limit per pool (default: `20`).
    pub db_max_connections: u32,
    /// Retry policy for admission transactions that hit contention.
    pub admission_retry: RetryPolicy,
    /// JWT verification settings.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `3000`                  |
    /// | `CORS_ORIGINS`            | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `30`                    |
    /// | `DATABASE_URL`            | **required**            |
    /// | `READ_REPLICA_URLS`       | (empty)                 |
    /// | `DB_MAX_CONNECTIONS`      | `20`                    |
    /// | `ADMISSION_MAX_ATTEMPTS`  | `4`                     |
    /// | `ADMISSION_RETRY_BASE_MS` | `20`                    |
    /// | `ADMISSION_RETRY_MAX_MS`  | `250`                   |
    ///
    /// # Panics
    ///
    /// Panics on a missing `DATABASE_URL` or any unparsable value, so a
    /// misconfigured server never starts.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_parse("PORT", 3000);
        let cors_origins = env_list("CORS_ORIGINS", "http://localhost:5173");
        let request_timeout_secs: u64 = env_parse("REQUEST_TIMEOUT_SECS", 30);
        let shutdown_timeout_secs: u64 = env_parse("SHUTDOWN_TIMEOUT_SECS", 30);

        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let read_replica_urls = env_list("READ_REPLICA_URLS", "");
        let db_max_connections: u32 =
            env_parse("DB_MAX_CONNECTIONS", registrar_db::DEFAULT_MAX_CONNECTIONS);

        let defaults = RetryPolicy::transactional();
        let admission_retry = RetryPolicy::new(
            env_parse("ADMISSION_MAX_ATTEMPTS", defaults.max_attempts),
            env_parse("ADMISSION_RETRY_BASE_MS", defaults.base_delay_ms),
            env_parse("ADMISSION_RETRY_MAX_MS", defaults.max_delay_ms),
            defaults.jitter_pct,
        );

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            database_url,
            read_replica_urls,
            db_max_connections,
            admission_retry,
            jwt: JwtConfig::from_env(),
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid value: {e}")),
        Err(_) => default,
    }
}

fn env_list(key: &str, default: &str) -> Vec<String> {
    std::env::var(key)
        .unwrap_or_else(|_| default.into())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
