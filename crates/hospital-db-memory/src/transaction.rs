use async_trait::async_trait;
use hospital_storage::{
    Delete, Insert, RecordTransaction, Row, Select, StorageResult, Update,
};
use tokio::sync::OwnedRwLockWriteGuard;

use crate::query::State;

/// Transaction over an [`InMemoryStore`](crate::InMemoryStore).
///
/// Holds the store's write lock until it is committed, rolled back or
/// dropped. Writes apply to the live tables immediately; a snapshot taken
/// at `begin` is restored unless the transaction commits.
pub struct MemoryTransaction {
    guard: OwnedRwLockWriteGuard<State>,
    snapshot: Option<State>,
}

impl MemoryTransaction {
    pub(crate) fn new(guard: OwnedRwLockWriteGuard<State>) -> Self {
        let snapshot = Some(guard.clone());
        Self { guard, snapshot }
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
            tracing::debug!("memory transaction rolled back");
        }
    }
}

#[async_trait]
impl RecordTransaction for MemoryTransaction {
    async fn select(&mut self, query: &Select) -> StorageResult<Vec<Row>> {
        self.guard.select(query)
    }

    async fn insert(&mut self, statement: &Insert) -> StorageResult<u64> {
        self.guard.insert(statement)
    }

    async fn update(&mut self, statement: &Update) -> StorageResult<u64> {
        self.guard.update(statement)
    }

    async fn delete(&mut self, statement: &Delete) -> StorageResult<u64> {
        self.guard.delete(statement)
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        self.snapshot = None;
        tracing::debug!("memory transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        // Dropping restores the snapshot.
        Ok(())
    }
}
