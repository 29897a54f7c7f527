//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! variant is reported to HTTP clients.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};
use wanderlust_core::{AccessDenied, PortError, ValidationError};

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A malformed or missing field, caught before anything was written.
    #[error("{0}")]
    Validation(String),

    /// The username or email is already taken.
    #[error("{0}")]
    DuplicateIdentity(String),

    /// Wrong username/password pair, or wrong current password.
    #[error("{0}")]
    InvalidCredentials(String),

    /// No session, or an expired one, on a protected route.
    #[error("You must be logged in to do that")]
    Unauthenticated,

    /// Signed in, but not the owner or author.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// The geocoder produced no usable point for the given location.
    #[error("{0}")]
    Geocode(String),

    /// The geocoder or image host failed outright.
    #[error("Upstream service failed: {0}")]
    Upstream(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::DuplicateIdentity(_) | Self::Geocode(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredentials(_) | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Database(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message a client is allowed to see. Server-side details stay in the log.
    fn public_message(&self) -> String {
        match self {
            Self::Upstream(_) => "An upstream service failed, please try again".to_string(),
            Self::Config(_) | Self::Database(_) | Self::Io(_) | Self::Internal(_) => {
                "Something went wrong!".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!(status = status.as_u16(), "Request rejected: {}", self);
        }
        let body = Json(json!({
            "success": false,
            "message": self.public_message(),
        }));
        (status, body).into_response()
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => Self::NotFound(what),
            PortError::Conflict(what) => Self::DuplicateIdentity(what),
            PortError::Unexpected(what) => Self::Internal(what),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.0)
    }
}

impl From<AccessDenied> for ApiError {
    fn from(err: AccessDenied) -> Self {
        match err {
            AccessDenied::NotFound(_) => Self::NotFound(err.to_string()),
            AccessDenied::Forbidden(reason) => Self::Forbidden(reason.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::Validation(format!("Invalid multipart body: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wanderlust_core::ResourceKind;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::DuplicateIdentity("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidCredentials("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Upstream("x".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn access_denied_keeps_its_meaning() {
        let not_found: ApiError = AccessDenied::NotFound(ResourceKind::Review).into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.to_string(), "Review not found");

        let forbidden: ApiError = AccessDenied::Forbidden("nope").into();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = ApiError::Internal("connection reset by peer".into());
        assert_eq!(err.public_message(), "Something went wrong!");
    }
}
