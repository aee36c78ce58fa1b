//! PostgreSQL Durable Store Adapter
//!
//! Connection pooling via deadpool-postgres and a `DurableStore`
//! implementation over a single `users` table. Driver errors are mapped to
//! `TierError` at this boundary; a unique-constraint violation on email
//! becomes `DuplicateKey`.

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolError, RecyclingMethod, Runtime};
use std::time::Duration;
use tierbench_core::{Record, RecordId, Tier, TierError, TierResult, Timestamp};
use tierbench_storage::DurableStore;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};
use tracing::debug;

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait/create timeout for pooled connections
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "tierbench".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 32,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("TIERBENCH_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("TIERBENCH_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("TIERBENCH_DB_NAME").unwrap_or_else(|_| "tierbench".to_string()),
            user: std::env::var("TIERBENCH_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("TIERBENCH_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("TIERBENCH_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(32),
            timeout: Duration::from_secs(
                std::env::var("TIERBENCH_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> TierResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size.max(1));
        pool_cfg.timeouts.wait = Some(self.timeout);
        pool_cfg.timeouts.create = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| TierError::unavailable(Tier::Durable, format!("failed to create pool: {}", e)))
    }
}

// ============================================================================
// SQL
// ============================================================================

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    id SERIAL PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    email VARCHAR(100) UNIQUE NOT NULL,
    created_at TIMESTAMPTZ DEFAULT NOW()
)";

const INSERT: &str =
    "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id, name, email, created_at";

const SELECT_BY_ID: &str = "SELECT id, name, email, created_at FROM users WHERE id = $1";

const SELECT_ALL: &str = "SELECT id, name, email, created_at FROM users ORDER BY id";

const DELETE_BY_ID: &str = "DELETE FROM users WHERE id = $1";

const COUNT: &str = "SELECT COUNT(*) FROM users";

// ============================================================================
// ERROR MAPPING
// ============================================================================

fn map_pool_error(err: PoolError) -> TierError {
    match err {
        PoolError::Timeout(_) => TierError::unavailable(Tier::Durable, "connection pool exhausted"),
        PoolError::Closed => TierError::unavailable(Tier::Durable, "connection pool is closed"),
        other => TierError::unavailable(Tier::Durable, other),
    }
}

fn map_pg_error(err: tokio_postgres::Error) -> TierError {
    if err.is_closed() {
        TierError::unavailable(Tier::Durable, err)
    } else {
        TierError::query_failed(Tier::Durable, err)
    }
}

fn map_insert_error(err: tokio_postgres::Error, email: &str) -> TierError {
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        TierError::DuplicateKey {
            email: email.to_string(),
        }
    } else {
        map_pg_error(err)
    }
}

fn record_from_row(row: &Row) -> TierResult<Record> {
    let created_at: Option<Timestamp> = row.try_get("created_at").map_err(map_pg_error)?;
    Ok(Record {
        id: row.try_get("id").map_err(map_pg_error)?,
        name: row.try_get("name").map_err(map_pg_error)?,
        email: row.try_get("email").map_err(map_pg_error)?,
        created_at: created_at
            .ok_or_else(|| TierError::query_failed(Tier::Durable, "created_at is NULL"))?,
    })
}

// ============================================================================
// ADAPTER
// ============================================================================

/// `DurableStore` backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    /// Create a new store with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new store from configuration.
    pub fn from_config(config: &DbConfig) -> TierResult<Self> {
        Ok(Self::new(config.create_pool()?))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    async fn get_conn(&self) -> TierResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(map_pool_error)
    }
}

#[async_trait]
impl DurableStore for PgStore {
    async fn ensure_schema(&self) -> TierResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(CREATE_TABLE).await.map_err(map_pg_error)?;
        debug!("users table ready");
        Ok(())
    }

    async fn insert(&self, name: &str, email: &str) -> TierResult<Record> {
        let conn = self.get_conn().await?;
        let stmt = conn.prepare_cached(INSERT).await.map_err(map_pg_error)?;
        let row = conn
            .query_one(&stmt, &[&name, &email])
            .await
            .map_err(|e| map_insert_error(e, email))?;
        record_from_row(&row)
    }

    async fn find_by_id(&self, id: RecordId) -> TierResult<Option<Record>> {
        let conn = self.get_conn().await?;
        let stmt = conn.prepare_cached(SELECT_BY_ID).await.map_err(map_pg_error)?;
        let row = conn.query_opt(&stmt, &[&id]).await.map_err(map_pg_error)?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn find_all(&self) -> TierResult<Vec<Record>> {
        let conn = self.get_conn().await?;
        let rows = conn.query(SELECT_ALL, &[]).await.map_err(map_pg_error)?;
        rows.iter().map(record_from_row).collect()
    }

    async fn delete_by_id(&self, id: RecordId) -> TierResult<u64> {
        let conn = self.get_conn().await?;
        let stmt = conn.prepare_cached(DELETE_BY_ID).await.map_err(map_pg_error)?;
        conn.execute(&stmt, &[&id]).await.map_err(map_pg_error)
    }

    async fn count(&self) -> TierResult<u64> {
        let conn = self.get_conn().await?;
        let row = conn.query_one(COUNT, &[]).await.map_err(map_pg_error)?;
        let count: i64 = row.try_get(0).map_err(map_pg_error)?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "tierbench");
        assert_eq!(config.max_size, 32);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_pool_error_maps_to_unavailable() {
        let err = map_pool_error(PoolError::Closed);
        assert!(matches!(
            err,
            TierError::AdapterUnavailable {
                tier: Tier::Durable,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_create_pool_is_lazy() {
        // Pool creation does not connect, so an unreachable host still succeeds.
        let config = DbConfig {
            host: "203.0.113.1".to_string(),
            ..DbConfig::default()
        };
        let store = PgStore::from_config(&config).unwrap();
        assert_eq!(store.pool_size(), 0);
    }

    #[test]
    fn test_schema_matches_record_shape() {
        for column in ["id SERIAL PRIMARY KEY", "email VARCHAR(100) UNIQUE NOT NULL"] {
            assert!(CREATE_TABLE.contains(column));
        }
        assert!(INSERT.ends_with("RETURNING id, name, email, created_at"));
    }
}
