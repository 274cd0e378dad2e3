//! Error types for the Twined service-event domain.
//!
//! Decoding and shaping errors ([`DecodeError`], [`IdentifierError`],
//! [`JobBuildError`]) describe malformed input. Port errors ([`StoreError`],
//! [`DispatchError`], [`TopicError`], [`RegistryError`]) are what
//! infrastructure adapters report back through the traits in
//! [`crate::ports`]; each adapter maps its own transport errors onto them.
//!
//! Nothing here is retried locally. Handlers surface these errors to the
//! transport, which owns redelivery.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

/// A string could not be interpreted as the identifier it should carry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// The value is not of the form `"namespace/name:revision_tag"`.
    #[error("'{value}' is not a valid service revision identifier (expected 'namespace/name:revision_tag')")]
    InvalidSruid {
        /// The rejected value.
        value: String,
    },

    /// A required identifier was empty.
    #[error("no {kind} was provided")]
    Empty {
        /// Human-readable name of the identifier kind (e.g. `"service identifier"`).
        kind: &'static str,
    },
}

/// A Pub/Sub message could not be decoded into an event and its attributes.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The message `data` field is not valid base64.
    #[error("message data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded message data is not valid JSON.
    #[error("message data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The decoded event is valid JSON but not a JSON object.
    #[error("event must be a JSON object")]
    NotAnObject,

    /// The event has no string `kind` field.
    #[error("event has no 'kind' field")]
    MissingKind,

    /// The message envelope has no message ID.
    #[error("message has no message ID")]
    MissingMessageId,

    /// A required attribute is absent from the message.
    #[error("message is missing the '{name}' attribute")]
    MissingAttribute {
        /// Name of the missing attribute.
        name: String,
    },
}

/// A question event could not be shaped into a job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobBuildError {
    /// A required attribute is absent from the question.
    #[error("question is missing the '{name}' attribute")]
    MissingAttribute {
        /// Name of the missing attribute.
        name: String,
    },

    /// The question's recipient is not a valid SRUID.
    #[error(transparent)]
    InvalidRecipient(#[from] IdentifierError),
}

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// The event store could not persist a row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store accepted the request but rejected the row.
    ///
    /// Carries the store's per-row error descriptions verbatim.
    #[error("row rejected: {}", errors.join("; "))]
    Rejected {
        /// Error descriptions reported by the store.
        errors: Vec<String>,
    },

    /// The request to the store failed (transport, authentication, API error).
    #[error("event store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

/// The job dispatcher could not create or delete a job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A job with this name already exists.
    #[error("job '{name}' already exists")]
    AlreadyExists {
        /// Name of the conflicting job.
        name: String,
    },

    /// No job with this name exists.
    #[error("job '{name}' not found")]
    NotFound {
        /// Name of the missing job.
        name: String,
    },

    /// Any other failure from the cluster API.
    #[error("cluster API error: {message}")]
    Api {
        /// Description of the failure.
        message: String,
    },
}

/// The topic administration API failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    /// The topic does not exist (e.g. already deleted by a concurrent sweep).
    #[error("topic '{topic}' not found")]
    NotFound {
        /// Full resource name of the topic.
        topic: String,
    },

    /// Any other failure from the topic API.
    #[error("topic API error: {message}")]
    Api {
        /// Description of the failure.
        message: String,
    },
}

/// The image registry could not be listed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Failure from the registry API.
    #[error("image registry error: {message}")]
    Api {
        /// Description of the failure.
        message: String,
    },
}
