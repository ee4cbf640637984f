//! PostgreSQL transaction implementation.

use async_trait::async_trait;
use sqlx_postgres::PgTransaction;

use hospital_storage::{
    Delete, Insert, RecordTransaction, Row, Select, StorageError, StorageResult, Update,
};

use crate::codec::decode_row;
use crate::error::statement_error;
use crate::storage::prepare;

/// PostgreSQL transaction wrapper.
///
/// The transaction automatically rolls back on drop if not explicitly
/// committed.
pub struct PostgresTransaction {
    /// Wrapped in Option so we can take ownership during commit/rollback.
    tx: Option<PgTransaction<'static>>,
}

impl PostgresTransaction {
    /// Wraps an open sqlx transaction.
    pub fn new(tx: PgTransaction<'static>) -> Self {
        Self { tx: Some(tx) }
    }

    fn open(&mut self) -> StorageResult<&mut PgTransaction<'static>> {
        self.tx.as_mut().ok_or_else(|| {
            StorageError::transaction_error("Transaction already completed (committed or rolled back)")
        })
    }
}

#[async_trait]
impl RecordTransaction for PostgresTransaction {
    async fn select(&mut self, query: &Select) -> StorageResult<Vec<Row>> {
        let compiled = query.compile()?;
        let tx = self.open()?;
        let rows = prepare(&compiled)?
            .fetch_all(&mut **tx)
            .await
            .map_err(statement_error)?;
        rows.iter().map(decode_row).collect()
    }

    async fn insert(&mut self, statement: &Insert) -> StorageResult<u64> {
        let compiled = statement.compile()?;
        let tx = self.open()?;
        let result = prepare(&compiled)?
            .execute(&mut **tx)
            .await
            .map_err(statement_error)?;
        Ok(result.rows_affected())
    }

    async fn update(&mut self, statement: &Update) -> StorageResult<u64> {
        let compiled = statement.compile()?;
        let tx = self.open()?;
        let result = prepare(&compiled)?
            .execute(&mut **tx)
            .await
            .map_err(statement_error)?;
        Ok(result.rows_affected())
    }

    async fn delete(&mut self, statement: &Delete) -> StorageResult<u64> {
        let compiled = statement.compile()?;
        let tx = self.open()?;
        let result = prepare(&compiled)?
            .execute(&mut **tx)
            .await
            .map_err(statement_error)?;
        Ok(result.rows_affected())
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await.map_err(|e| {
                StorageError::transaction_error(format!("Failed to commit transaction: {e}"))
            })?;
            tracing::debug!("Transaction committed successfully");
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await.map_err(|e| {
                StorageError::transaction_error(format!("Failed to rollback transaction: {e}"))
            })?;
            tracing::debug!("Transaction rolled back successfully");
        }
        Ok(())
    }
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        if self.tx.is_some() {
            // sqlx issues the ROLLBACK when its transaction is dropped.
            tracing::warn!(
                "PostgresTransaction dropped without explicit commit/rollback - will auto-rollback"
            );
        }
    }
}
