//! Response types and error handling for API endpoints
//!
//! Every failure renders as `{code, message, details}` through
//! [`ErrorResponse`], the same body the gateway sends on its `error` frame.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rolechat_common::{AppError, ErrorResponse};
use rolechat_core::DomainError;
use rolechat_service::ServiceError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

/// API error type for consistent error responses
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    App(#[from] AppError),

    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid path parameter: {0}")]
    InvalidPath(String),

    #[error("Invalid request: {0}")]
    InvalidBody(String),

    #[error("Invalid query parameter: {0}")]
    InvalidQuery(String),

    #[error("Missing authorization header")]
    MissingAuth,

    #[error("Invalid or expired token")]
    InvalidToken,
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl ApiError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::App(e) => status(e.status_code()),
            Self::Service(e) => status(e.status_code()),
            Self::Domain(e) => status(e.status_code()),
            Self::Validation(_) | Self::InvalidPath(_) | Self::InvalidBody(_) | Self::InvalidQuery(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::MissingAuth | Self::InvalidToken => StatusCode::UNAUTHORIZED,
        }
    }

    #[must_use]
    pub fn error_code(&self) -> &str {
        match self {
            Self::App(e) => e.error_code(),
            Self::Service(e) => e.error_code(),
            Self::Domain(e) => e.code(),
            Self::Validation(_) | Self::InvalidBody(_) => "VALIDATION_ERROR",
            Self::InvalidPath(_) => "INVALID_PATH_PARAMETER",
            Self::InvalidQuery(_) => "INVALID_QUERY_PARAMETER",
            Self::MissingAuth => "MISSING_AUTH",
            Self::InvalidToken => "INVALID_TOKEN",
        }
    }

    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    pub fn invalid_body(msg: impl Into<String>) -> Self {
        Self::InvalidBody(msg.into())
    }

    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    /// Render the body; domain and service errors go through [`AppError`] so
    /// role names and limits land in `details`
    fn into_body(self) -> ErrorResponse {
        match self {
            Self::App(e) => ErrorResponse::from(e),
            Self::Service(e) => ErrorResponse::from(AppError::from(e)),
            Self::Domain(e) => ErrorResponse::from(AppError::Domain(e)),
            Self::Validation(errors) => ErrorResponse {
                code: "VALIDATION_ERROR".to_string(),
                message: "Request validation failed".to_string(),
                details: serde_json::to_value(&errors).ok(),
            },
            other => ErrorResponse {
                code: other.error_code().to_string(),
                message: other.to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = ?self, "Server error occurred");
        }

        (status, Json(self.into_body())).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

/// Created response (201) with JSON body
pub struct Created<T>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

/// No content response (204)
pub struct NoContent;

impl IntoResponse for NoContent {
    fn into_response(self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolechat_core::{Role, Snowflake};

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(ApiError::MissingAuth.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::invalid_path("bad id").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DomainError::QuotaExceeded { limit: 5 }).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::from(ServiceError::from(DomainError::MembershipRequired)).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(DomainError::TransportError("down".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_api_error_codes() {
        assert_eq!(ApiError::MissingAuth.error_code(), "MISSING_AUTH");
        assert_eq!(
            ApiError::invalid_path("bad id").error_code(),
            "INVALID_PATH_PARAMETER"
        );
        assert_eq!(
            ApiError::from(DomainError::UserNotFound(Snowflake::new(1))).error_code(),
            "UNKNOWN_USER"
        );
    }

    #[test]
    fn test_permission_denied_body_names_roles() {
        let err = ApiError::from(ServiceError::from(DomainError::PermissionDenied {
            sender_role: Role::Student,
            recipient_role: Role::Student,
        }));
        let body = err.into_body();

        assert_eq!(body.code, "PERMISSION_DENIED");
        let details = body.details.unwrap();
        assert_eq!(details["sender_role"], "student");
        assert_eq!(details["recipient_role"], "student");
    }

    #[test]
    fn test_server_errors_hide_internals() {
        let body = ApiError::from(DomainError::DatabaseError("relation missing".into())).into_body();
        assert_eq!(body.message, "Internal server error");
    }
}
