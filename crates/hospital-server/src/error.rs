//! HTTP error mapping.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hospital_auth::AuthError;
use hospital_core::{ServiceError, ServiceErrorCategory};
use serde_json::json;

/// Every failure a handler or middleware can return.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The body could not be parsed as the expected JSON shape.
    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("Content-Type must be application/json")]
    UnsupportedMediaType,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Service(err) => match err.category() {
                ServiceErrorCategory::Validation => StatusCode::BAD_REQUEST,
                ServiceErrorCategory::NotFound => StatusCode::NOT_FOUND,
                ServiceErrorCategory::DataAccess => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials
                | AuthError::MissingToken
                | AuthError::InvalidToken { .. }
                | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
                AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
                AuthError::UsernameTaken { .. } => StatusCode::CONFLICT,
                AuthError::Storage(_) | AuthError::Hashing { .. } | AuthError::Configuration { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => Self::UnsupportedMediaType,
            other => Self::BadRequest(other.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Server-side failures are logged in full and reported generically.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hospital_storage::StorageError;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::validation("missing patient_id"), StatusCode::BAD_REQUEST),
            (ServiceError::not_found("Patient"), StatusCode::NOT_FOUND),
            (
                ServiceError::from(StorageError::query("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn auth_errors_map_to_statuses() {
        assert_eq!(ApiError::from(AuthError::MissingToken).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(AuthError::TokenExpired).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(AuthError::forbidden("patients only")).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(AuthError::username_taken("jane")).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn not_found_message_is_passed_through() {
        let err = ApiError::from(ServiceError::not_found("Employee"));
        assert_eq!(err.to_string(), "Employee not found");
    }
}
