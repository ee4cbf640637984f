//! # hospital-core
//!
//! Domain layer of the hospital records service.
//!
//! - [`mapping`] coerces result rows into response fields (dates, times,
//!   decimals, nullable sentinels).
//! - [`models`] holds the request and response shapes.
//! - [`PatientService`] assembles and writes the patient aggregate.
//! - [`EmployeeService`] reads and writes the employee directory.
//!
//! Services hold a [`DynRecordStore`](hospital_storage::DynRecordStore) and
//! know nothing about the backend behind it.

mod employee;
mod error;
pub mod mapping;
pub mod models;
mod patient;
mod writer;

pub use employee::{EmployeeService, map_employee};
pub use error::{ServiceError, ServiceErrorCategory, ServiceResult};
pub use mapping::{DecodeWarning, NOT_RESIGNED};
pub use patient::PatientService;
pub use writer::WriteMode;
