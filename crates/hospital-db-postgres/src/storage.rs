//! PostgreSQL implementation of the RecordStore trait.

use async_trait::async_trait;
use sqlx_core::pool::PoolOptions;
use sqlx_postgres::{PgPool, Postgres};
use tracing::{debug, info, instrument};

use hospital_storage::{
    CompiledQuery, Delete, Insert, RecordStore, RecordTransaction, Row, Select, StorageError,
    StorageResult, Update,
};

use crate::codec::{PgQuery, bind_params, decode_row};
use crate::config::PostgresConfig;
use crate::error::{PostgresError, statement_error};
use crate::transaction::PostgresTransaction;

/// Reference DDL for the hospital schema. Not applied automatically.
pub const REFERENCE_SCHEMA: &str = include_str!("../sql/schema.sql");

/// PostgreSQL record store.
///
/// Compiles typed statements to parameterized SQL, binds the parameters by
/// their `SqlValue` variant and decodes result rows back into `SqlValue`s.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Opens a pool sized by [`PostgresConfig::sizing`] and checks that the
    /// server answers.
    ///
    /// # Errors
    ///
    /// `Config` for impossible pool limits, `Connection` when the server is
    /// unreachable.
    #[instrument(skip(config), fields(url = %config.redacted_url()))]
    pub async fn connect(config: &PostgresConfig) -> Result<Self, PostgresError> {
        let sizing = config.sizing()?;
        info!(
            max_connections = sizing.max_connections,
            min_connections = sizing.min_connections,
            "connecting record store"
        );

        let mut options = PoolOptions::<Postgres>::new()
            .max_connections(sizing.max_connections)
            .min_connections(sizing.min_connections)
            .acquire_timeout(sizing.acquire_timeout)
            .max_lifetime(sizing.max_lifetime);
        if let Some(idle) = sizing.idle_timeout {
            options = options.idle_timeout(idle);
        }
        let pool = options.connect(&config.url).await?;

        sqlx_core::query::query("SELECT 1").execute(&pool).await?;
        debug!("record store reachable");
        Ok(Self { pool })
    }

    /// Creates a new `PostgresStore` from an existing connection pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the tables of [`REFERENCE_SCHEMA`] for tests and local setup.
    ///
    /// # Errors
    ///
    /// Returns `PostgresError::Schema` if any statement fails.
    #[instrument(skip(self))]
    pub async fn apply_reference_schema(&self) -> Result<(), PostgresError> {
        for statement in REFERENCE_SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            sqlx_core::query::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| PostgresError::schema(e.to_string()))?;
        }
        info!("Reference schema applied");
        Ok(())
    }
}

/// Compiles and binds a statement.
pub(crate) fn prepare(compiled: &CompiledQuery) -> StorageResult<PgQuery<'_>> {
    debug!(sql = %compiled.sql, params = compiled.params.len(), "executing statement");
    bind_params(sqlx_core::query::query(&compiled.sql), &compiled.params)
}

#[async_trait]
impl RecordStore for PostgresStore {
    async fn select(&self, query: &Select) -> StorageResult<Vec<Row>> {
        let compiled = query.compile()?;
        let rows = prepare(&compiled)?
            .fetch_all(&self.pool)
            .await
            .map_err(statement_error)?;
        rows.iter().map(decode_row).collect()
    }

    async fn insert(&self, statement: &Insert) -> StorageResult<u64> {
        let compiled = statement.compile()?;
        let result = prepare(&compiled)?
            .execute(&self.pool)
            .await
            .map_err(statement_error)?;
        Ok(result.rows_affected())
    }

    async fn update(&self, statement: &Update) -> StorageResult<u64> {
        let compiled = statement.compile()?;
        let result = prepare(&compiled)?
            .execute(&self.pool)
            .await
            .map_err(statement_error)?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, statement: &Delete) -> StorageResult<u64> {
        let compiled = statement.compile()?;
        let result = prepare(&compiled)?
            .execute(&self.pool)
            .await
            .map_err(statement_error)?;
        Ok(result.rows_affected())
    }

    async fn begin_transaction(&self) -> StorageResult<Box<dyn RecordTransaction>> {
        let tx = self.pool.begin().await.map_err(|e| {
            StorageError::transaction_error(format!("Failed to begin transaction: {e}"))
        })?;
        debug!("Transaction started");
        Ok(Box::new(PostgresTransaction::new(tx)))
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
