//! In-memory port implementations for tests.
//!
//! Compiled for this crate's tests and for downstream crates that enable the
//! `test-utils` feature.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::{DispatchError, RegistryError, StoreError, TopicError};
use crate::identifiers::JobName;
use crate::job::QuestionJob;
use crate::ports::{EventStore, ImageRegistry, JobDispatcher, TopicAdmin};
use crate::row::EventRow;
use crate::types::{TaggedImage, Topic};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Records inserted rows; optionally fails every insert.
#[derive(Debug, Default)]
pub struct RecordingEventStore {
    rows: Mutex<Vec<EventRow>>,
    failure: Option<StoreError>,
}

impl RecordingEventStore {
    /// Creates a store that accepts every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that rejects every row with `error`.
    pub fn failing(error: StoreError) -> Self {
        Self {
            rows: Mutex::default(),
            failure: Some(error),
        }
    }

    /// Returns the rows inserted so far.
    pub fn rows(&self) -> Vec<EventRow> {
        lock(&self.rows).clone()
    }
}

#[async_trait]
impl EventStore for RecordingEventStore {
    async fn insert_row(&self, row: &EventRow) -> Result<(), StoreError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        lock(&self.rows).push(row.clone());
        Ok(())
    }
}

/// Records created and deleted jobs; optionally fails every call.
#[derive(Debug, Default)]
pub struct RecordingJobDispatcher {
    created: Mutex<Vec<QuestionJob>>,
    deleted: Mutex<Vec<JobName>>,
    failure: Option<DispatchError>,
}

impl RecordingJobDispatcher {
    /// Creates a dispatcher that accepts every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dispatcher that fails every call with `error`.
    pub fn failing(error: DispatchError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Returns the jobs created so far.
    pub fn created(&self) -> Vec<QuestionJob> {
        lock(&self.created).clone()
    }

    /// Returns the names of the jobs deleted so far.
    pub fn deleted(&self) -> Vec<JobName> {
        lock(&self.deleted).clone()
    }
}

#[async_trait]
impl JobDispatcher for RecordingJobDispatcher {
    async fn create_job(&self, job: &QuestionJob) -> Result<(), DispatchError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        lock(&self.created).push(job.clone());
        Ok(())
    }

    async fn delete_job(&self, name: &JobName) -> Result<(), DispatchError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        lock(&self.deleted).push(name.clone());
        Ok(())
    }
}

/// A fixed set of topics. Deleting a topic records it; topics marked as
/// vanished report [`TopicError::NotFound`] as if a concurrent sweep won.
#[derive(Debug, Default)]
pub struct InMemoryTopicAdmin {
    topics: Vec<Topic>,
    vanished: HashSet<String>,
    failing: HashSet<String>,
    deleted: Mutex<Vec<String>>,
}

impl InMemoryTopicAdmin {
    /// Creates an admin listing `topics`.
    pub fn new(topics: Vec<Topic>) -> Self {
        Self {
            topics,
            ..Self::default()
        }
    }

    /// Marks a topic as already deleted by someone else.
    #[must_use]
    pub fn with_vanished(mut self, name: impl Into<String>) -> Self {
        self.vanished.insert(name.into());
        self
    }

    /// Makes deleting a topic fail with an API error.
    #[must_use]
    pub fn with_failing(mut self, name: impl Into<String>) -> Self {
        self.failing.insert(name.into());
        self
    }

    /// Returns the topics deleted so far.
    pub fn deleted(&self) -> Vec<String> {
        lock(&self.deleted).clone()
    }
}

#[async_trait]
impl TopicAdmin for InMemoryTopicAdmin {
    async fn list_topics(&self) -> Result<Vec<Topic>, TopicError> {
        Ok(self.topics.clone())
    }

    async fn delete_topic(&self, name: &str) -> Result<(), TopicError> {
        if self.vanished.contains(name) {
            return Err(TopicError::NotFound {
                topic: name.to_string(),
            });
        }
        if self.failing.contains(name) {
            return Err(TopicError::Api {
                message: "permission denied".to_string(),
            });
        }
        lock(&self.deleted).push(name.to_string());
        Ok(())
    }
}

/// A fixed image listing.
#[derive(Debug, Default)]
pub struct StaticImageRegistry {
    images: Vec<TaggedImage>,
    failure: Option<RegistryError>,
}

impl StaticImageRegistry {
    /// Creates a registry listing `images`.
    pub fn new(images: Vec<TaggedImage>) -> Self {
        Self {
            images,
            failure: None,
        }
    }

    /// Creates a registry whose listing always fails with `error`.
    pub fn failing(error: RegistryError) -> Self {
        Self {
            images: Vec::new(),
            failure: Some(error),
        }
    }
}

#[async_trait]
impl ImageRegistry for StaticImageRegistry {
    async fn list_images(&self) -> Result<Vec<TaggedImage>, RegistryError> {
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(self.images.clone()),
        }
    }
}
