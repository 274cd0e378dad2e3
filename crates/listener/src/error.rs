//! Error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

/// A failed request, rendered as a plain-text body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be interpreted.
    #[error("{message}")]
    BadRequest { message: String },
    /// The requested resource does not exist.
    #[error("{message}")]
    NotFound { message: String },
    /// A downstream service failed.
    #[error("{message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Internal { message } => error!(status = status.as_u16(), %message, "Request failed."),
            Self::BadRequest { message } => warn!(status = status.as_u16(), %message, "Rejected request."),
            Self::NotFound { .. } => {}
        }

        let message = match self {
            Self::BadRequest { message } | Self::NotFound { message } | Self::Internal { message } => message,
        };
        (status, message).into_response()
    }
}
