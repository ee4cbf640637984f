//! # hospital-storage
//!
//! Data-access abstraction layer for the hospital records service.
//!
//! This crate defines the traits and types that every record store backend
//! implements. It does not talk to a database itself - the PostgreSQL and
//! in-memory backends live in separate crates.
//!
//! ## Overview
//!
//! - [`SqlValue`] is the tagged value exchanged with a backend, in both
//!   directions (bound parameters and decoded columns).
//! - [`Row`] is one result row: column name to [`SqlValue`].
//! - [`Select`], [`Insert`], [`Update`] and [`Delete`] describe statements.
//!   Each compiles to a parameterized SQL string with `$n` placeholders.
//! - [`RecordStore`] executes statements; [`RecordTransaction`] does the
//!   same inside a transaction scope.
//!
//! ## Example
//!
//! ```ignore
//! use hospital_storage::{Filter, RecordStore, Row, Select, StorageError};
//!
//! async fn find_by_last_name(
//!     store: &dyn RecordStore,
//!     last_name: &str,
//! ) -> Result<Vec<Row>, StorageError> {
//!     let query = Select::from("Patient")
//!         .filter(Filter::optional_contains("last_name", last_name))
//!         .order_by_desc("patient_id");
//!
//!     store.select(&query).await
//! }
//! ```

mod error;
pub mod query;
mod row;
mod traits;
mod value;

pub use error::{ErrorCategory, StorageError};
pub use query::{CompiledQuery, Delete, Filter, Insert, Join, OrderBy, Select, Update};
pub use row::Row;
pub use traits::{RecordStore, RecordTransaction};
pub use value::{DATE_FORMAT, SqlValue, TIME_FORMAT};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shareable record store.
pub type DynRecordStore = std::sync::Arc<dyn RecordStore>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use hospital_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::query::{CompiledQuery, Delete, Filter, Insert, Join, OrderBy, Select, Update};
    pub use crate::row::Row;
    pub use crate::traits::{RecordStore, RecordTransaction};
    pub use crate::value::SqlValue;
    pub use crate::{DynRecordStore, StorageResult};
}
