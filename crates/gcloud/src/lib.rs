//! Google Cloud infrastructure adapters.
//!
//! Implements the port traits of the [`events`] crate against Google Cloud
//! REST APIs:
//!
//! | Adapter | Port | API |
//! |---------|------|-----|
//! | [`BigQueryEventStore`] | [`events::EventStore`] | BigQuery `tabledata.insertAll` |
//! | [`PubSubTopicAdmin`] | [`events::TopicAdmin`] | Pub/Sub `topics.list` / `topics.delete` |
//! | [`ArtifactRegistryImages`] | [`events::ImageRegistry`] | Artifact Registry `dockerImages.list` |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Authentication, request formatting, pagination and
//! error-body parsing live here. The [`events`] crate sees only its traits.
//!
//! ## Authentication
//!
//! Requests carry a bearer token from a [`TokenSource`]. In production this is
//! [`ApplicationDefaultCredentials`] (the metadata server on Cloud Run, or a
//! service-account key / gcloud user credentials locally). Tests use
//! [`StaticToken`] and point each adapter at a local endpoint.

pub mod artifact_registry;
pub mod auth;
pub mod bigquery;
pub mod client;
pub mod error;
pub mod pubsub;

pub use artifact_registry::ArtifactRegistryImages;
pub use auth::{ApplicationDefaultCredentials, StaticToken, TokenSource};
pub use bigquery::{BigQueryEventStore, TableId};
pub use client::GoogleApiClient;
pub use error::GcloudError;
pub use pubsub::PubSubTopicAdmin;
