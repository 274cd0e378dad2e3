//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! a [`QuestionUuid`] with a [`MessageId`] even though both are strings under the
//! hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::IdentifierError;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single handler invocation (one HTTP request from the trigger).
///
/// Generated fresh for every request; recorded on the request span so all
/// activity from a single invocation can be correlated in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(Uuid);

impl InvocationId {
    /// Generates a new random invocation identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: string-backed (assigned by senders or the transport)
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies one question asked of a service.
    ///
    /// Assigned by the asking service and carried in the `question_uuid`
    /// attribute of every event belonging to the question.
    QuestionUuid
}

string_id! {
    /// The Pub/Sub message ID assigned by the transport on publish.
    MessageId
}

string_id! {
    /// A service revision tag (e.g. `"1.0.0"`, `"default"`).
    RevisionTag
}

string_id! {
    /// A service unique identifier in `"namespace/name"` form.
    ///
    /// The service registry receives SUIDs from request paths and compares them
    /// against image names in the artifact repository.
    Suid
}

// ---------------------------------------------------------------------------
// Service revision identifier
// ---------------------------------------------------------------------------

/// A service-revision unique identifier: `"namespace/name:revision_tag"`.
///
/// Questions are addressed to an SRUID via the `recipient` attribute; the
/// dispatched job runs the image of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sruid {
    namespace: String,
    name: String,
    revision_tag: RevisionTag,
}

impl Sruid {
    /// Parses an SRUID, requiring exactly one `/` and exactly one `:` after it.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidSruid`] if any component is missing or
    /// the separators appear the wrong number of times.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        let invalid = || IdentifierError::InvalidSruid {
            value: value.to_string(),
        };

        let (namespace, name_and_tag) = value.split_once('/').ok_or_else(invalid)?;
        if name_and_tag.contains('/') {
            return Err(invalid());
        }

        let (name, tag) = name_and_tag.split_once(':').ok_or_else(invalid)?;
        if tag.contains(':') || namespace.is_empty() || name.is_empty() {
            return Err(invalid());
        }

        let revision_tag = RevisionTag::new(tag).ok_or_else(invalid)?;

        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            revision_tag,
        })
    }

    /// Returns the service namespace (the part before `/`).
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the service name (between `/` and `:`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the revision tag (the part after `:`).
    pub fn revision_tag(&self) -> &RevisionTag {
        &self.revision_tag
    }
}

impl std::fmt::Display for Sruid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}:{}", self.namespace, self.name, self.revision_tag)
    }
}

// ---------------------------------------------------------------------------
// Job name
// ---------------------------------------------------------------------------

/// Name of the Kubernetes Job running a question.
///
/// Derived from the question UUID alone, so a cancellation event (which only
/// shares the question UUID with its question) addresses the same Job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobName(String);

impl JobName {
    /// Returns the job name for the given question.
    pub fn for_question(question_uuid: &QuestionUuid) -> Self {
        Self(format!("question-{}", question_uuid.as_str()))
    }

    /// Returns the job name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
