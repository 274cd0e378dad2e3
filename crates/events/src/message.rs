//! Pub/Sub push messages and their decoding.
//!
//! Both the event handler and the helper are triggered by Pub/Sub. A push
//! subscription (or an Eventarc trigger in binary CloudEvent mode) delivers:
//!
//! ```json
//! {
//!   "message": {
//!     "data": "<base64 JSON event>",
//!     "attributes": {"question_uuid": "...", "sender": "..."},
//!     "messageId": "1234",
//!     "orderingKey": "optional"
//!   },
//!   "subscription": "projects/.../subscriptions/..."
//! }
//! ```
//!
//! The push format duplicates some fields in snake case (`message_id`,
//! `ordering_key`); both spellings are accepted.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::DecodeError;
use crate::identifiers::MessageId;

/// Message attributes: a flat string-keyed map attached to the envelope.
///
/// Values are kept as JSON values so that non-string attributes survive
/// verbatim into the overflow column and the job's `--attributes` argument.
pub type Attributes = Map<String, Value>;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The body of a Pub/Sub push request.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelope {
    /// The delivered message.
    pub message: PushMessage,

    /// Full resource name of the subscription that delivered the message.
    #[serde(default)]
    pub subscription: Option<String>,
}

/// A single Pub/Sub message as delivered by push.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushMessage {
    /// Base64-encoded payload. Absent for attribute-only messages.
    #[serde(default)]
    pub data: Option<String>,

    /// Message attributes.
    #[serde(default)]
    pub attributes: Attributes,

    #[serde(default, rename = "messageId")]
    message_id_camel: Option<String>,

    #[serde(default, rename = "message_id")]
    message_id_snake: Option<String>,

    #[serde(default, rename = "orderingKey")]
    ordering_key_camel: Option<String>,

    #[serde(default, rename = "ordering_key")]
    ordering_key_snake: Option<String>,
}

impl PushMessage {
    /// Creates a message from a raw JSON payload (encoded here) and attributes.
    ///
    /// Mostly useful for tests and local tooling; production messages arrive
    /// already encoded.
    pub fn from_payload(payload: &[u8], attributes: Attributes, message_id: &str) -> Self {
        Self {
            data: Some(base64::engine::general_purpose::STANDARD.encode(payload)),
            attributes,
            message_id_camel: Some(message_id.to_string()),
            ..Self::default()
        }
    }

    /// Sets the ordering key, returning the message.
    #[must_use]
    pub fn with_ordering_key(mut self, ordering_key: impl Into<String>) -> Self {
        self.ordering_key_camel = Some(ordering_key.into());
        self
    }

    /// Returns the message ID assigned by Pub/Sub, whichever spelling carried it.
    pub fn message_id(&self) -> Option<MessageId> {
        self.message_id_camel
            .as_deref()
            .or(self.message_id_snake.as_deref())
            .and_then(MessageId::new)
    }

    /// Returns the ordering key, if the message was published with one.
    pub fn ordering_key(&self) -> Option<&str> {
        self.ordering_key_camel
            .as_deref()
            .or(self.ordering_key_snake.as_deref())
            .filter(|key| !key.is_empty())
    }

    /// Decodes the payload into an [`Event`] and collects the attributes and
    /// transport metadata.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the payload is not base64-encoded JSON
    /// describing an object with a string `kind`, or the message has no ID.
    pub fn decode(&self) -> Result<DecodedMessage, DecodeError> {
        let message_id = self.message_id().ok_or(DecodeError::MissingMessageId)?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(self.data.as_deref().unwrap_or_default())?;
        let value: Value = serde_json::from_slice(&bytes)?;
        let event = Event::from_value(value)?;

        Ok(DecodedMessage {
            event,
            attributes: self.attributes.clone(),
            backend_metadata: BackendMetadata {
                message_id: message_id.as_str().to_string(),
                ordering_key: self.ordering_key().map(str::to_string),
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Decoded content
// ---------------------------------------------------------------------------

/// Transport-specific metadata stored alongside every row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendMetadata {
    /// Pub/Sub message ID.
    pub message_id: String,
    /// Pub/Sub ordering key; `null` when the message was published without one.
    pub ordering_key: Option<String>,
}

/// The discriminator of a service event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A question addressed to a service; triggers job dispatch.
    Question,
    /// Cancellation of an earlier question; triggers job deletion.
    Cancellation,
    /// Any other kind (`heart`, `result`, `delivery_acknowledgement`, ...).
    Other(String),
}

impl EventKind {
    /// Interprets a `kind` string.
    pub fn parse(kind: &str) -> Self {
        match kind {
            "question" => Self::Question,
            "cancellation" => Self::Cancellation,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the wire spelling of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Question => "question",
            Self::Cancellation => "cancellation",
            Self::Other(kind) => kind,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded service event: its `kind` plus the remaining payload fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: String,
    body: Map<String, Value>,
}

impl Event {
    /// Splits a JSON value into `kind` and the rest of the payload.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::NotAnObject`] or [`DecodeError::MissingKind`].
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let Value::Object(mut body) = value else {
            return Err(DecodeError::NotAnObject);
        };

        match body.remove("kind") {
            Some(Value::String(kind)) => Ok(Self { kind, body }),
            _ => Err(DecodeError::MissingKind),
        }
    }

    /// Returns the raw `kind` string.
    pub fn kind_str(&self) -> &str {
        &self.kind
    }

    /// Returns the interpreted event kind.
    pub fn kind(&self) -> EventKind {
        EventKind::parse(&self.kind)
    }

    /// Returns the payload without the `kind` field.
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Returns a payload field, if present.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }
}

/// A fully decoded Pub/Sub message.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    /// The service event carried in the payload.
    pub event: Event,
    /// All message attributes, untouched.
    pub attributes: Attributes,
    /// Transport metadata.
    pub backend_metadata: BackendMetadata,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn attributes() -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("question_uuid".into(), json!("q-1"));
        attributes
    }

    #[test]
    fn decodes_push_envelope_json() {
        let envelope: PushEnvelope = serde_json::from_value(json!({
            "message": {
                "data": "eyJraW5kIjogImhlYXJ0In0=",
                "attributes": {"question_uuid": "q-1"},
                "messageId": "1234",
                "message_id": "1234",
                "publishTime": "2024-04-11T09:26:39Z",
                "publish_time": "2024-04-11T09:26:39Z"
            },
            "subscription": "projects/p/subscriptions/s"
        }))
        .unwrap();

        let decoded = envelope.message.decode().unwrap();

        assert_eq!(decoded.event.kind(), EventKind::Other("heart".into()));
        assert!(decoded.event.body().is_empty());
        assert_eq!(decoded.backend_metadata.message_id, "1234");
        assert_eq!(decoded.backend_metadata.ordering_key, None);
    }

    #[test]
    fn decode_keeps_ordering_key() {
        let message = PushMessage::from_payload(br#"{"kind": "question"}"#, attributes(), "1")
            .with_ordering_key("key");

        let decoded = message.decode().unwrap();

        assert_eq!(decoded.backend_metadata.ordering_key.as_deref(), Some("key"));
        assert_eq!(decoded.event.kind(), EventKind::Question);
    }

    #[test]
    fn decode_rejects_invalid_payloads() {
        let not_base64 = PushMessage {
            data: Some("***".into()),
            message_id_camel: Some("1".into()),
            ..PushMessage::default()
        };
        assert!(matches!(not_base64.decode(), Err(DecodeError::Base64(_))));

        let not_json = PushMessage::from_payload(b"not json", attributes(), "1");
        assert!(matches!(not_json.decode(), Err(DecodeError::Json(_))));

        let not_object = PushMessage::from_payload(b"[1, 2]", attributes(), "1");
        assert!(matches!(not_object.decode(), Err(DecodeError::NotAnObject)));

        let no_kind = PushMessage::from_payload(br#"{"some": "data"}"#, attributes(), "1");
        assert!(matches!(no_kind.decode(), Err(DecodeError::MissingKind)));
    }

    #[test]
    fn decode_requires_message_id() {
        let message = PushMessage::from_payload(br#"{"kind": "heart"}"#, attributes(), "");
        assert!(matches!(message.decode(), Err(DecodeError::MissingMessageId)));
    }

    #[test]
    fn snake_case_message_id_is_accepted() {
        let message: PushMessage =
            serde_json::from_value(json!({"data": "", "message_id": "99"})).unwrap();
        assert_eq!(message.message_id().unwrap().as_str(), "99");
    }
}
