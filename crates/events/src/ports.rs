//! Port traits implemented by infrastructure adapters.
//!
//! | Trait | Implemented by |
//! |-------|----------------|
//! | [`EventStore`] | `gcloud::BigQueryEventStore` |
//! | [`JobDispatcher`] | `kueue::KueueDispatcher` |
//! | [`TopicAdmin`] | `gcloud::PubSubTopicAdmin` |
//! | [`ImageRegistry`] | `gcloud::ArtifactRegistryImages` |
//!
//! All traits are object-safe so handlers can hold `Arc<dyn Trait>`.

use async_trait::async_trait;

use crate::errors::{DispatchError, RegistryError, StoreError, TopicError};
use crate::identifiers::JobName;
use crate::job::QuestionJob;
use crate::row::EventRow;
use crate::types::{TaggedImage, Topic};

/// Append-only storage for event rows.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends one row.
    ///
    /// Implementations must not retry; any failure is returned as-is.
    async fn insert_row(&self, row: &EventRow) -> Result<(), StoreError>;
}

/// Submits and removes question jobs on the batch platform.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    /// Creates the job in a suspended state.
    async fn create_job(&self, job: &QuestionJob) -> Result<(), DispatchError>;

    /// Deletes the job with the given name, including its pods.
    async fn delete_job(&self, name: &JobName) -> Result<(), DispatchError>;
}

/// Lists and deletes topics in one project.
#[async_trait]
pub trait TopicAdmin: Send + Sync {
    /// Returns every topic in the project, across all result pages.
    async fn list_topics(&self) -> Result<Vec<Topic>, TopicError>;

    /// Deletes a topic by full resource name.
    ///
    /// Returns [`TopicError::NotFound`] if the topic does not exist.
    async fn delete_topic(&self, name: &str) -> Result<(), TopicError>;
}

/// Read-only view of the images in one artifact repository.
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Returns every image in the repository, across all result pages.
    async fn list_images(&self) -> Result<Vec<TaggedImage>, RegistryError>;
}
