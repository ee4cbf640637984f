//! Authentication configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AuthError, AuthResult};
use crate::jwt::MIN_SECRET_LEN;

/// Token signing configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// jwt_secret = "change-me-to-a-long-random-string!!"
/// issuer = "hospital-records"
/// token_ttl = "24h"
/// ```
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 shared secret. Must be at least 32 bytes.
    pub jwt_secret: String,

    /// Token `iss` claim, checked on verification.
    pub issuer: String,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: "hospital-records".to_string(),
            token_ttl: Duration::from_secs(24 * 3600),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl AuthConfig {
    /// Creates a configuration with the given secret and default issuer/TTL.
    #[must_use]
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            ..Self::default()
        }
    }

    /// Set the issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Set the token lifetime.
    #[must_use]
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for a short secret, an empty issuer or a zero TTL.
    pub fn validate(&self) -> AuthResult<()> {
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::configuration(format!(
                "jwt_secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if self.issuer.trim().is_empty() {
            return Err(AuthError::configuration("issuer cannot be empty"));
        }
        if self.token_ttl.is_zero() {
            return Err(AuthError::configuration("token_ttl must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_need_a_secret() {
        let config = AuthConfig::default();
        assert_eq!(config.token_ttl, Duration::from_secs(86400));
        assert!(config.validate().is_err());

        assert!(AuthConfig::new("x".repeat(32)).validate().is_ok());
    }

    #[test]
    fn ttl_parses_humantime() {
        let config: AuthConfig = serde_json::from_str(
            r#"{"jwt_secret": "0123456789abcdef0123456789abcdef", "token_ttl": "90m"}"#,
        )
        .unwrap();
        assert_eq!(config.token_ttl, Duration::from_secs(5400));
        assert_eq!(config.issuer, "hospital-records");
    }

    #[test]
    fn debug_hides_secret() {
        let rendered = format!("{:?}", AuthConfig::new("super-secret-value-that-is-long-enough"));
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let config = AuthConfig::new("x".repeat(32)).with_token_ttl(Duration::ZERO);
        assert!(matches!(config.validate(), Err(AuthError::Configuration { .. })));
    }
}
