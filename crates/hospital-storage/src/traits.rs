//! Record store traits.
//!
//! This module defines the contract every storage backend implements.

use async_trait::async_trait;

use crate::StorageResult;
use crate::query::{Delete, Insert, Select, Update};
use crate::row::Row;

/// The executor contract every record store backend implements.
///
/// Statements are passed as typed descriptions; a SQL backend compiles them
/// with [`Select::compile`] and friends, other backends may interpret them
/// directly. Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use hospital_storage::{Filter, RecordStore, Row, Select, StorageError};
///
/// async fn department_names(store: &dyn RecordStore) -> Result<Vec<Row>, StorageError> {
///     store
///         .select(&Select::from("Department").columns(["department_name"]))
///         .await
/// }
/// ```
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Runs a SELECT and returns every matching row, in backend order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidQuery` for a malformed description and
    /// `StorageError::Query` when the backend rejects the statement.
    async fn select(&self, query: &Select) -> StorageResult<Vec<Row>>;

    /// Runs an INSERT and returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UniqueViolation` when a unique key is taken
    /// and `StorageError::Query` on other backend failures.
    async fn insert(&self, statement: &Insert) -> StorageResult<u64>;

    /// Runs an UPDATE and returns the number of rows changed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidQuery` when there is nothing to set.
    async fn update(&self, statement: &Update) -> StorageResult<u64>;

    /// Runs a DELETE and returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidQuery` for a DELETE without predicates.
    async fn delete(&self, statement: &Delete) -> StorageResult<u64>;

    /// Begins a new transaction.
    ///
    /// The returned transaction must be either committed or rolled back.
    /// Dropping it without either discards its writes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::TransactionError` if a transaction cannot be
    /// started.
    async fn begin_transaction(&self) -> StorageResult<Box<dyn RecordTransaction>>;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// A transaction scope for running several statements atomically.
///
/// Reads inside the transaction see its own uncommitted writes.
///
/// # Example
///
/// ```ignore
/// let mut tx = store.begin_transaction().await?;
/// tx.delete(&Delete::from("patient_drug_allergy").filter(by_patient.clone())).await?;
/// tx.insert(&Insert::into("patient_drug_allergy").value("patient_id", "P1")).await?;
/// tx.commit().await?;
/// ```
#[async_trait]
pub trait RecordTransaction: Send {
    /// Runs a SELECT within this transaction.
    async fn select(&mut self, query: &Select) -> StorageResult<Vec<Row>>;

    /// Runs an INSERT within this transaction.
    async fn insert(&mut self, statement: &Insert) -> StorageResult<u64>;

    /// Runs an UPDATE within this transaction.
    async fn update(&mut self, statement: &Update) -> StorageResult<u64>;

    /// Runs a DELETE within this transaction.
    async fn delete(&mut self, statement: &Delete) -> StorageResult<u64>;

    /// Commits all statements run in this transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::TransactionError` if the commit fails.
    async fn commit(self: Box<Self>) -> StorageResult<()>;

    /// Rolls back all statements run in this transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::TransactionError` if the rollback fails.
    async fn rollback(self: Box<Self>) -> StorageResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that RecordStore is object-safe
    fn _assert_store_object_safe(_: &dyn RecordStore) {}

    // Compile-time test that RecordTransaction is object-safe
    fn _assert_transaction_object_safe(_: &mut dyn RecordTransaction) {}
}
