//! Projection of a decoded message into an audit row.
//!
//! A fixed set of attributes is pulled out into dedicated columns for
//! querying. Every other attribute lands in `other_attributes`, so nothing is
//! dropped as senders add attributes over time.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::DecodeError;
use crate::message::{Attributes, BackendMetadata, DecodedMessage};

/// Value of the `backend` column for rows received over Pub/Sub.
pub const BACKEND: &str = "GoogleCloudPubSub";

/// Attributes stored in their own columns rather than `other_attributes`.
pub const EXTRACTED_ATTRIBUTES: [&str; 11] = [
    "datetime",
    "uuid",
    "parent",
    "originator",
    "sender",
    "sender_type",
    "sender_sdk_version",
    "recipient",
    "question_uuid",
    "parent_question_uuid",
    "originator_question_uuid",
];

/// One row of the events table.
///
/// Serialises to the column layout of the table; `event`,
/// `other_attributes` and `backend_metadata` are JSON columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    pub datetime: String,
    pub uuid: String,
    pub kind: String,
    /// The event payload without its `kind`.
    pub event: Map<String, Value>,
    /// Attributes not extracted into columns, verbatim.
    pub other_attributes: Attributes,
    pub parent: String,
    pub originator: String,
    pub sender: String,
    pub sender_type: String,
    pub sender_sdk_version: String,
    pub recipient: String,
    pub question_uuid: String,
    pub parent_question_uuid: String,
    pub originator_question_uuid: String,
    pub backend: String,
    pub backend_metadata: BackendMetadata,
}

impl EventRow {
    /// Builds the row for a decoded message.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::MissingAttribute`] naming the first extracted
    /// attribute that the message does not carry.
    pub fn build(message: &DecodedMessage) -> Result<Self, DecodeError> {
        let mut remaining = message.attributes.clone();
        let [
            datetime,
            uuid,
            parent,
            originator,
            sender,
            sender_type,
            sender_sdk_version,
            recipient,
            question_uuid,
            parent_question_uuid,
            originator_question_uuid,
        ] = EXTRACTED_ATTRIBUTES.map(|name| take_text(&mut remaining, name));

        Ok(Self {
            datetime: datetime?,
            uuid: uuid?,
            kind: message.event.kind_str().to_string(),
            event: message.event.body().clone(),
            parent: parent?,
            originator: originator?,
            sender: sender?,
            sender_type: sender_type?,
            sender_sdk_version: sender_sdk_version?,
            recipient: recipient?,
            question_uuid: question_uuid?,
            parent_question_uuid: parent_question_uuid?,
            originator_question_uuid: originator_question_uuid?,
            other_attributes: remaining,
            backend: BACKEND.to_string(),
            backend_metadata: message.backend_metadata.clone(),
        })
    }

    /// Returns the message ID this row was built from.
    pub fn message_id(&self) -> &str {
        &self.backend_metadata.message_id
    }
}

/// Removes an attribute and renders it as column text.
///
/// String values are taken as-is; any other JSON value is stored as its JSON
/// text.
fn take_text(attributes: &mut Attributes, name: &str) -> Result<String, DecodeError> {
    match attributes.remove(name) {
        Some(Value::String(text)) => Ok(text),
        Some(other) => Ok(other.to_string()),
        None => Err(DecodeError::MissingAttribute {
            name: name.to_string(),
        }),
    }
}
