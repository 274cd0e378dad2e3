//! Core domain for the Twined service-event functions.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, and port trait used by the three cloud handlers (event handler,
//! helper, service registry). Infrastructure crates implement the traits
//! defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`Suid`, `Sruid`, `QuestionUuid`, `JobName`, etc.) |
//! | [`types`] | Shared value types (`Timestamp`, `Topic`, `TaggedImage`) |
//! | [`message`] | Pub/Sub push envelope and its decoding into an [`Event`] plus attributes |
//! | [`row`] | Projection of a decoded message into a BigQuery [`EventRow`] |
//! | [`job`] | Projection of a question event into a suspended [`QuestionJob`] |
//! | [`sweep`] | Answer-topic retention rules |
//! | [`registry`] | Service-revision lookup rules over tagged images |
//! | [`ports`] | Traits implemented by infrastructure adapters |
//! | [`errors`] | Error types shared across the domain and its ports |

pub mod errors;
pub mod identifiers;
pub mod job;
pub mod message;
pub mod ports;
pub mod registry;
pub mod row;
pub mod sweep;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{
    DecodeError, DispatchError, IdentifierError, JobBuildError, RegistryError, StoreError,
    TopicError,
};
pub use identifiers::{InvocationId, JobName, MessageId, QuestionUuid, RevisionTag, Sruid, Suid};
pub use job::{EnvVar, JobSettings, QuestionJob, ResourceRequests};
pub use message::{
    Attributes, BackendMetadata, DecodedMessage, Event, EventKind, PushEnvelope, PushMessage,
};
pub use ports::{EventStore, ImageRegistry, JobDispatcher, TopicAdmin};
pub use registry::{LookupOutcome, RevisionQuery};
pub use row::EventRow;
pub use sweep::{LegacyTopicAction, MaintenanceAction, SweepDecision, SweepPolicy, SweepSummary};
pub use types::{TaggedImage, Timestamp, Topic};
