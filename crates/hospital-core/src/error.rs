use std::fmt;

use hospital_storage::StorageError;
use thiserror::Error;

/// Errors returned by the patient and employee workflows.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required field is missing or blank, or an input value is malformed.
    #[error("Invalid request: {message}")]
    Validation { message: String },

    /// An id lookup or search matched no rows.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Any statement or decode failure in the data-access layer.
    #[error("Data access error: {0}")]
    DataAccess(#[from] StorageError),
}

impl ServiceError {
    /// Create a new Validation error
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new NotFound error
    #[must_use]
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    /// Returns `true` for `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for `Validation`.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns the error category for logging and status mapping.
    #[must_use]
    pub fn category(&self) -> ServiceErrorCategory {
        match self {
            Self::Validation { .. } => ServiceErrorCategory::Validation,
            Self::NotFound { .. } => ServiceErrorCategory::NotFound,
            Self::DataAccess(_) => ServiceErrorCategory::DataAccess,
        }
    }
}

/// Coarse classification of [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceErrorCategory {
    /// Client sent something unusable.
    Validation,
    /// Nothing matched.
    NotFound,
    /// The data-access layer failed.
    DataAccess,
}

impl fmt::Display for ServiceErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::DataAccess => write!(f, "data_access"),
        }
    }
}

/// Result alias for workflow operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ServiceError::not_found("Patient").to_string(),
            "Patient not found"
        );
        assert_eq!(
            ServiceError::validation("missing patient_id").to_string(),
            "Invalid request: missing patient_id"
        );
    }

    #[test]
    fn test_storage_errors_become_data_access() {
        let err: ServiceError = StorageError::query("connection reset").into();
        assert_eq!(err.category(), ServiceErrorCategory::DataAccess);
        assert!(!err.is_not_found());
        assert_eq!(err.category().to_string(), "data_access");
    }
}
