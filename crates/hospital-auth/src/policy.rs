//! Role-based route access.

use crate::error::{AuthError, AuthResult};
use crate::jwt::TokenClaims;

/// Role whose holders may only see their own record.
pub const PATIENT_ROLE: &str = "patient";

/// Paths a `patient` may call.
const PATIENT_PATHS: &[&str] = &["/profile", "/patients/me"];

/// Checks whether the caller may use `path`.
///
/// Patients are confined to their profile and their own record. Every
/// other role may use every authenticated route.
///
/// # Errors
///
/// Returns `Forbidden` when the role does not permit the path.
pub fn authorize_path(claims: &TokenClaims, path: &str) -> AuthResult<()> {
    if !claims.has_role(PATIENT_ROLE) {
        return Ok(());
    }

    let path = path.trim_end_matches('/');
    if PATIENT_PATHS.contains(&path) {
        Ok(())
    } else {
        Err(AuthError::forbidden(format!(
            "role '{}' may not access {path}",
            claims.role
        )))
    }
}
