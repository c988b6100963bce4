//! PostgreSQL client implementation
//!
//! Connection pooling and schema setup for the patient record store.

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{HieError, Result};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::{NoTls, Row};

/// Pooled PostgreSQL client
pub struct PostgreSQLClient {
    pool: Pool,
    config: PostgreSQLConfig,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// The pool connects lazily; use [`test_connection`](Self::test_connection)
    /// to verify connectivity.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is invalid or the pool
    /// cannot be built.
    pub async fn new(config: PostgreSQLConfig) -> Result<Self> {
        let pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .parse()
            .map_err(|e| {
                HieError::Configuration(format!("Invalid PostgreSQL connection string: {}", e))
            })?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| HieError::Database(format!("Failed to create connection pool: {}", e)))?;

        Ok(Self { pool, config })
    }

    /// Execute a trivial query to check connectivity
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;

        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| HieError::Database(format!("Connection test failed: {}", e)))?;

        tracing::info!(
            target_db = %self.connection_string_safe(),
            "PostgreSQL connection test successful"
        );
        Ok(())
    }

    /// Create the `patients` table and indexes if they don't exist
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.get_connection().await?;

        let migration_sql = include_str!("../../../migrations/001_initial_schema.sql");

        client
            .batch_execute(migration_sql)
            .await
            .map_err(|e| HieError::Database(format!("Failed to execute migration: {}", e)))?;

        tracing::info!("PostgreSQL schema initialized successfully");
        Ok(())
    }

    /// Get a connection from the pool
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| HieError::Database(format!("Failed to get connection from pool: {}", e)))
    }

    /// `SET LOCAL` statement applied at the start of every transaction
    pub fn statement_timeout_sql(&self) -> String {
        format!(
            "SET LOCAL statement_timeout = {}",
            self.config.statement_timeout_seconds * 1000
        )
    }

    /// Execute a query outside a transaction and return rows
    pub async fn query(
        &self,
        query: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<Row>> {
        let client = self.get_connection().await?;

        client
            .execute(
                &format!(
                    "SET statement_timeout = {}",
                    self.config.statement_timeout_seconds * 1000
                ),
                &[],
            )
            .await
            .map_err(|e| HieError::Database(format!("Failed to set statement timeout: {}", e)))?;

        client
            .query(query, params)
            .await
            .map_err(|e| HieError::Database(format!("Query failed: {}", e)))
    }

    /// Execute a statement outside a transaction
    pub async fn execute(
        &self,
        statement: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<u64> {
        let client = self.get_connection().await?;

        client
            .execute(statement, params)
            .await
            .map_err(|e| HieError::Database(format!("Statement execution failed: {}", e)))
    }

    /// Connection string with credentials redacted
    pub fn connection_string_safe(&self) -> String {
        redact_connection_string(self.config.connection_string.expose_secret().as_str())
    }
}

fn redact_connection_string(conn_str: &str) -> String {
    match conn_str.rsplit_once('@') {
        Some((_, host)) => format!("postgresql://***@{}", host),
        None => "postgresql://***".to_string(),
    }
}
