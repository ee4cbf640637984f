//! In-memory record store backend for the hospital records service.
//!
//! This crate provides an in-memory implementation of the `RecordStore`
//! trait from `hospital-storage`. It interprets typed statements directly,
//! which makes it suitable for tests and local development without a
//! database.
//!
//! # Example
//!
//! ```ignore
//! use hospital_db_memory::InMemoryStore;
//! use hospital_storage::{Insert, RecordStore};
//!
//! let store = InMemoryStore::with_hospital_schema();
//! store
//!     .insert(&Insert::into("Patient").value("patient_id", "P1"))
//!     .await?;
//! ```

mod query;
mod storage;
mod transaction;

pub use storage::InMemoryStore;
pub use transaction::MemoryTransaction;

/// Creates a new in-memory record store with the hospital schema defined.
pub fn create_record_store() -> hospital_storage::DynRecordStore {
    std::sync::Arc::new(InMemoryStore::with_hospital_schema())
}
