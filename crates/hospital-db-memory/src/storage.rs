use std::sync::Arc;

use async_trait::async_trait;
use hospital_storage::{
    Delete, Insert, RecordStore, RecordTransaction, Row, Select, StorageResult, Update,
};
use tokio::sync::RwLock;

use crate::query::{State, Table};
use crate::transaction::MemoryTransaction;

/// Tables of the hospital schema with their primary and unique keys.
const HOSPITAL_TABLES: &[(&str, &[&[&str]])] = &[
    ("Patient", &[&["patient_id"]]),
    ("Medical_history", &[]),
    ("patient_chronic_disease", &[&["patient_id", "disease_id"]]),
    ("patient_drug_allergy", &[&["patient_id", "drug_id"]]),
    ("patient_appointment", &[]),
    ("Employee", &[&["employee_id"]]),
    ("Position", &[&["position_id"]]),
    ("Department", &[&["department_id"]]),
    ("disease", &[&["disease_id"]]),
    ("drug", &[&["drug_id"]]),
    ("users", &[&["username"]]),
];

/// In-memory record store.
///
/// Tables are schema-less lists of rows behind one `tokio` `RwLock`.
/// Statements must target a defined table; SELECTs support joins, the
/// three filter kinds, ordering and limits. A transaction holds the write
/// lock for its whole lifetime and restores a snapshot on rollback.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    pub(crate) state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a store without any tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with every table of the hospital schema defined.
    #[must_use]
    pub fn with_hospital_schema() -> Self {
        let mut state = State::default();
        for (name, keys) in HOSPITAL_TABLES {
            state.tables.insert(
                name.to_ascii_lowercase(),
                Table {
                    rows: Vec::new(),
                    unique_keys: keys
                        .iter()
                        .map(|key| key.iter().map(|c| (*c).to_string()).collect())
                        .collect(),
                },
            );
        }
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Defines (or redefines as empty) a table with the given unique keys.
    pub async fn define_table(&self, name: &str, unique_keys: &[&[&str]]) {
        let mut state = self.state.write().await;
        state.tables.insert(
            name.to_ascii_lowercase(),
            Table {
                rows: Vec::new(),
                unique_keys: unique_keys
                    .iter()
                    .map(|key| key.iter().map(|c| (*c).to_string()).collect())
                    .collect(),
            },
        );
    }

    /// Appends rows to a table without going through statement validation.
    ///
    /// Creates the table if it does not exist.
    pub async fn seed(&self, table: &str, rows: impl IntoIterator<Item = Row>) {
        let mut state = self.state.write().await;
        state
            .tables
            .entry(table.to_ascii_lowercase())
            .or_default()
            .rows
            .extend(rows);
    }

    /// Makes every later INSERT into `table` fail with a query error.
    pub async fn fail_inserts_into(&self, table: &str) {
        let mut state = self.state.write().await;
        let name = table.to_ascii_lowercase();
        if !state.failing_inserts.contains(&name) {
            state.failing_inserts.push(name);
        }
    }

    /// Clears every injected failure.
    pub async fn clear_failures(&self) {
        self.state.write().await.failing_inserts.clear();
    }

    /// Number of rows currently stored in `table` (0 for unknown tables).
    pub async fn count(&self, table: &str) -> usize {
        self.state
            .read()
            .await
            .tables
            .get(&table.to_ascii_lowercase())
            .map_or(0, |t| t.rows.len())
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn select(&self, query: &Select) -> StorageResult<Vec<Row>> {
        self.state.read().await.select(query)
    }

    async fn insert(&self, statement: &Insert) -> StorageResult<u64> {
        self.state.write().await.insert(statement)
    }

    async fn update(&self, statement: &Update) -> StorageResult<u64> {
        self.state.write().await.update(statement)
    }

    async fn delete(&self, statement: &Delete) -> StorageResult<u64> {
        self.state.write().await.delete(statement)
    }

    async fn begin_transaction(&self) -> StorageResult<Box<dyn RecordTransaction>> {
        let guard = Arc::clone(&self.state).write_owned().await;
        tracing::debug!("memory transaction started");
        Ok(Box::new(MemoryTransaction::new(guard)))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
