//! Kubernetes adapter for question jobs.
//!
//! [`KueueDispatcher`] implements [`events::JobDispatcher`] against the
//! `batch/v1` Jobs API of one namespace. Jobs are created suspended and carry
//! the Kueue queue label; Kueue unsuspends them on admission.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** The conversion from [`events::QuestionJob`] to a
//! Kubernetes object lives in [`job`]; the API calls live in [`dispatcher`].

pub mod dispatcher;
pub mod error;
pub mod job;

pub use dispatcher::KueueDispatcher;
pub use error::KueueError;
pub use job::to_kubernetes_job;
