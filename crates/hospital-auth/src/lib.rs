//! # hospital-auth
//!
//! Authentication for the hospital records service: Argon2id password
//! hashes stored in the `users` table, HS256 bearer tokens, and the
//! role policy that confines patients to their own record.

pub mod config;
pub mod error;
pub mod jwt;
pub mod password;
pub mod policy;
pub mod users;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult, ErrorCategory};
pub use jwt::{JwtError, JwtService, TokenClaims};
pub use policy::{PATIENT_ROLE, authorize_path};
pub use users::{AuthService, LoginRequest, LoginResponse, Profile, RegisterRequest};
