//! Storage error types for the data-access layer.
//!
//! Backends report statement failures as [`StorageError::Query`]. The one
//! database condition they single out is a unique-key violation.

use std::fmt;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A statement failed while executing against the backend.
    #[error("Query error: {message}")]
    Query {
        /// Backend-provided description of the failure.
        message: String,
    },

    /// An INSERT or UPDATE collided with an existing unique key.
    #[error("Unique violation: {message}")]
    UniqueViolation {
        /// Backend-provided description, usually naming the constraint.
        message: String,
    },

    /// A statement description could not be compiled (bad identifier,
    /// empty SET list, unguarded DELETE).
    #[error("Invalid query: {message}")]
    InvalidQuery {
        /// Why the statement was rejected.
        message: String,
    },

    /// A column value could not be decoded into the requested shape.
    #[error("Decode error on column '{column}': {message}")]
    Decode {
        /// The column being decoded.
        column: String,
        /// Description of the mismatch.
        message: String,
    },

    /// An error occurred while beginning, committing or rolling back a transaction.
    #[error("Transaction error: {message}")]
    TransactionError {
        /// Description of the transaction error.
        message: String,
    },

    /// Failed to connect to the storage backend.
    #[error("Connection error: {message}")]
    ConnectionError {
        /// Description of the connection error.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `Query` error.
    #[must_use]
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Creates a new `UniqueViolation` error.
    #[must_use]
    pub fn unique_violation(message: impl Into<String>) -> Self {
        Self::UniqueViolation {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidQuery` error.
    #[must_use]
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Creates a new `Decode` error.
    #[must_use]
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Creates a new `TransactionError` error.
    #[must_use]
    pub fn transaction_error(message: impl Into<String>) -> Self {
        Self::TransactionError {
            message: message.into(),
        }
    }

    /// Creates a new `ConnectionError` error.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the statement was rejected before execution.
    #[must_use]
    pub fn is_invalid_query(&self) -> bool {
        matches!(self, Self::InvalidQuery { .. })
    }

    /// Returns `true` if a unique key was already taken.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }

    /// Returns `true` if a column could not be decoded.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Query { .. } | Self::UniqueViolation { .. } => ErrorCategory::Statement,
            Self::InvalidQuery { .. } => ErrorCategory::Validation,
            Self::Decode { .. } => ErrorCategory::Decode,
            Self::TransactionError { .. } => ErrorCategory::Transaction,
            Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A statement failed in the backend.
    Statement,
    /// The statement description was invalid.
    Validation,
    /// A result value had an unexpected shape.
    Decode,
    /// Transaction-related error.
    Transaction,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Statement => write!(f, "statement"),
            Self::Validation => write!(f, "validation"),
            Self::Decode => write!(f, "decode"),
            Self::Transaction => write!(f, "transaction"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::query("relation \"patient\" does not exist");
        assert_eq!(
            err.to_string(),
            "Query error: relation \"patient\" does not exist"
        );

        let err = StorageError::decode("hire_date", "expected a date, found text");
        assert_eq!(
            err.to_string(),
            "Decode error on column 'hire_date': expected a date, found text"
        );
    }

    #[test]
    fn test_error_predicates() {
        let err = StorageError::invalid_query("UPDATE without columns");
        assert!(err.is_invalid_query());
        assert!(!err.is_decode());

        let err = StorageError::decode("age", "not an integer");
        assert!(err.is_decode());
        assert!(!err.is_invalid_query());

        let err = StorageError::unique_violation("users_username_key");
        assert!(err.is_unique_violation());
        assert_eq!(err.category(), ErrorCategory::Statement);
        assert!(!StorageError::query("boom").is_unique_violation());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            StorageError::query("boom").category(),
            ErrorCategory::Statement
        );
        assert_eq!(
            StorageError::invalid_query("bad").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            StorageError::connection_error("refused").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(ErrorCategory::Decode.to_string(), "decode");
    }
}
