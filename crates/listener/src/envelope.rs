//! Request bodies delivered by Pub/Sub.
//!
//! A push subscription posts `{"message": {...}, "subscription": "..."}`
//! directly. Through Eventarc the same envelope arrives either unchanged
//! (binary-mode CloudEvent, metadata in `ce-*` headers) or wrapped in the
//! `data` field of a structured-mode CloudEvent.

use events::{PushEnvelope, PushMessage};
use serde::Deserialize;

use crate::error::ApiError;

/// Any body shape a Pub/Sub-triggered function may receive.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InboundEnvelope {
    /// Plain push, or binary-mode CloudEvent.
    Push(PushEnvelope),
    /// Structured-mode CloudEvent.
    CloudEvent { data: PushEnvelope },
}

impl InboundEnvelope {
    /// Parses a request body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::BadRequest`] if the body is not a Pub/Sub envelope.
    pub fn parse(body: &[u8]) -> Result<Self, ApiError> {
        serde_json::from_slice(body).map_err(|error| {
            ApiError::bad_request(format!("request body is not a Pub/Sub push envelope: {error}"))
        })
    }

    pub fn message(&self) -> &PushMessage {
        match self {
            Self::Push(envelope) | Self::CloudEvent { data: envelope } => &envelope.message,
        }
    }

    pub fn subscription(&self) -> Option<&str> {
        match self {
            Self::Push(envelope) | Self::CloudEvent { data: envelope } => {
                envelope.subscription.as_deref()
            }
        }
    }
}
