//! HTTP surface of the hospital records service.
//!
//! Routes requests to the patient and employee workflows in `hospital-core`
//! and the account endpoints in `hospital-auth`, behind bearer-token
//! authentication.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;

pub use config::{AppConfig, StorageBackend};
pub use error::ApiError;
pub use server::{AppState, HospitalServer, ServerBuilder, build_app};
