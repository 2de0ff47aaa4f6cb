//! Handler error types

use crate::protocol::CloseCode;
use rolechat_common::{AppError, ErrorResponse};
use rolechat_core::DomainError;
use rolechat_service::ServiceError;
use thiserror::Error;

/// Handler error type
#[derive(Debug, Error)]
pub enum HandlerError {
    /// `d` did not decode as the op's payload
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(#[source] AppError),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Already authenticated")]
    AlreadyAuthenticated,

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Cache error: {0}")]
    Cache(#[from] rolechat_cache::RedisPoolError),

    /// The socket's outgoing channel is gone
    #[error("Connection closed")]
    ConnectionClosed,
}

impl HandlerError {
    /// Errors that end the connection. Everything else is answered with an
    /// `error` frame.
    #[must_use]
    pub fn to_close_code(&self) -> Option<CloseCode> {
        match self {
            Self::AuthenticationFailed(_) => Some(CloseCode::AuthenticationFailed),
            Self::NotAuthenticated => Some(CloseCode::NotAuthenticated),
            Self::AlreadyAuthenticated => Some(CloseCode::AlreadyAuthenticated),
            Self::ConnectionClosed => Some(CloseCode::UnknownError),
            Self::InvalidPayload(_) | Self::Service(_) | Self::Cache(_) => None,
        }
    }

    /// Body of the `error` frame
    #[must_use]
    pub fn into_response(self) -> ErrorResponse {
        match self {
            Self::InvalidPayload(msg) => {
                ErrorResponse::from(AppError::Domain(DomainError::ValidationError(msg)))
            }
            Self::AuthenticationFailed(e) => ErrorResponse::from(e),
            Self::NotAuthenticated => ErrorResponse::from(AppError::MissingAuth),
            Self::Service(e) => service_response(e),
            other @ (Self::AlreadyAuthenticated | Self::Cache(_) | Self::ConnectionClosed) => {
                ErrorResponse {
                    code: "GATEWAY_ERROR".to_string(),
                    message: other.to_string(),
                    details: None,
                }
            }
        }
    }
}

/// Render a service error the way the REST surface does
#[must_use]
pub fn service_response(error: ServiceError) -> ErrorResponse {
    ErrorResponse::from(AppError::from(error))
}

pub type HandlerResult<T> = Result<T, HandlerError>;
