//! Errors raised by the Google Cloud adapters.

use serde::Deserialize;
use thiserror::Error;

/// A failed call to a Google Cloud API.
#[derive(Debug, Error)]
pub enum GcloudError {
    /// No access token could be obtained.
    #[error("failed to get Google Cloud access token: {message}")]
    Auth {
        /// Description of the failure.
        message: String,
    },

    /// The request could not be sent or its response could not be read.
    #[error("Google Cloud API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Google Cloud API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body (or the raw body).
        message: String,
    },

    /// A request body could not be serialised.
    #[error("failed to serialise request: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The adapter was constructed with invalid settings.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },
}

impl GcloudError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if the API reported that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// Builds an API error from a non-success response body.
    ///
    /// Google APIs answer with `{"error": {"code", "message", "status"}}`;
    /// when the body has that shape its message and status are used,
    /// otherwise the raw body is kept.
    pub(crate) fn from_response_body(status: u16, body: &str) -> Self {
        let message = match serde_json::from_str::<GoogleErrorResponse>(body) {
            Ok(response) if response.error.status.is_empty() => response.error.message,
            Ok(response) => format!("{} ({})", response.error.message, response.error.status),
            Err(_) if body.is_empty() => "no response body".to_string(),
            Err(_) => body.to_string(),
        };

        Self::Api { status, message }
    }
}

/// Google API error response.
#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: GoogleErrorDetails,
}

/// Google API error details.
#[derive(Debug, Deserialize)]
struct GoogleErrorDetails {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}
