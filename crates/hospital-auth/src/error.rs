//! Authentication and authorization error types.

use std::fmt;

use hospital_storage::StorageError;

use crate::jwt::JwtError;

/// Errors that can occur during registration, login and token checks.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A required field of a register or login request is blank.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of what is missing.
        message: String,
    },

    /// Unknown username or wrong password.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The username is already registered.
    #[error("Username '{username}' is already taken")]
    UsernameTaken {
        /// The rejected username.
        username: String,
    },

    /// No bearer token was presented.
    #[error("Missing bearer token")]
    MissingToken,

    /// The token is malformed or its signature or claims do not check out.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// The caller's role may not use this route.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description of why access is forbidden.
        message: String,
    },

    /// The users table could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Password hashing failed, or a stored hash is unreadable.
    #[error("Password hashing error: {message}")]
    Hashing {
        /// Description of the hashing error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `UsernameTaken` error.
    #[must_use]
    pub fn username_taken(username: impl Into<String>) -> Self {
        Self::UsernameTaken {
            username: username.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new `Hashing` error.
    #[must_use]
    pub fn hashing(message: impl Into<String>) -> Self {
        Self::Hashing {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if the caller failed to prove who they are.
    #[must_use]
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::MissingToken
                | Self::InvalidToken { .. }
                | Self::TokenExpired
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Hashing { .. } | Self::Configuration { .. }
        )
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::InvalidCredentials => ErrorCategory::Authentication,
            Self::UsernameTaken { .. } => ErrorCategory::Conflict,
            Self::MissingToken | Self::InvalidToken { .. } | Self::TokenExpired => {
                ErrorCategory::Token
            }
            Self::Forbidden { .. } => ErrorCategory::Authorization,
            Self::Storage(_) => ErrorCategory::Infrastructure,
            Self::Hashing { .. } => ErrorCategory::Internal,
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => Self::TokenExpired,
            JwtError::Secret { message } => Self::configuration(message),
            other => Self::invalid_token(other.to_string()),
        }
    }
}

/// Categories of auth errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Identity verification failed.
    Authentication,
    /// Permission check failed.
    Authorization,
    /// Token missing, invalid or expired.
    Token,
    /// Request validation errors.
    Validation,
    /// The resource already exists.
    Conflict,
    /// Storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Token => write!(f, "token"),
            Self::Validation => write!(f, "validation"),
            Self::Conflict => write!(f, "conflict"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_errors_map_to_token_errors() {
        assert!(matches!(AuthError::from(JwtError::Expired), AuthError::TokenExpired));
        let err = AuthError::from(JwtError::InvalidSignature);
        assert!(matches!(err, AuthError::InvalidToken { .. }));
        assert!(err.is_authentication_error());
        assert_eq!(err.category(), ErrorCategory::Token);
    }

    #[test]
    fn storage_errors_are_server_errors() {
        let err = AuthError::from(StorageError::query("connection reset"));
        assert!(err.is_server_error());
        assert_eq!(err.category().to_string(), "infrastructure");
    }

    #[test]
    fn taken_username_is_named() {
        let err = AuthError::username_taken("nurse1");
        assert_eq!(err.to_string(), "Username 'nurse1' is already taken");
        assert!(!err.is_server_error());
    }
}
