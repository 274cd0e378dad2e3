//! Periodic maintenance: the answer-topic sweep.
//!
//! Triggered by a scheduled Pub/Sub message whose `action` attribute names
//! the job to run. Concurrent sweeps may race on the same topic; losing a
//! delete race is not an error.

use std::sync::Arc;

use events::sweep::is_answer_topic;
use events::{
    DecodeError, MaintenanceAction, PushMessage, SweepDecision, SweepPolicy, SweepSummary,
    Timestamp, TopicAdmin, TopicError,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that fail a helper invocation.
#[derive(Debug, Error)]
pub enum HelperError {
    /// The trigger message has no usable `action` attribute.
    #[error("malformed message: {0}")]
    Decode(#[from] DecodeError),

    /// Listing or deleting topics failed.
    #[error("topic sweep failed: {0}")]
    Topic(#[from] TopicError),
}

/// Result of one helper invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HelperOutcome {
    /// The topic sweep ran.
    Swept(SweepSummary),
    /// The requested action is not known; nothing was done.
    Ignored { action: String },
}

/// Deletes answer topics older than the retention window.
pub struct TopicSweeper {
    topics: Arc<dyn TopicAdmin>,
    policy: SweepPolicy,
}

impl TopicSweeper {
    pub fn new(topics: Arc<dyn TopicAdmin>, policy: SweepPolicy) -> Self {
        Self { topics, policy }
    }

    /// Handles one trigger message.
    ///
    /// # Errors
    ///
    /// Returns [`HelperError::Decode`] when the message has no `action`, or
    /// [`HelperError::Topic`] when the sweep fails.
    pub async fn handle(&self, message: &PushMessage) -> Result<HelperOutcome, HelperError> {
        match MaintenanceAction::from_attributes(&message.attributes)? {
            MaintenanceAction::ClearTopics => Ok(HelperOutcome::Swept(self.sweep().await?)),
            MaintenanceAction::Other(action) => {
                warn!(action = %action, "Ignoring unknown helper action.");
                Ok(HelperOutcome::Ignored { action })
            }
        }
    }

    /// Sweeps topics as of now.
    ///
    /// # Errors
    ///
    /// Returns the first listing or deletion error other than not-found.
    pub async fn sweep(&self) -> Result<SweepSummary, TopicError> {
        self.sweep_at(Timestamp::now()).await
    }

    /// Sweeps topics as of `now`.
    ///
    /// # Errors
    ///
    /// Returns the first listing or deletion error other than not-found.
    pub async fn sweep_at(&self, now: Timestamp) -> Result<SweepSummary, TopicError> {
        let mut summary = SweepSummary::default();

        for topic in self.topics.list_topics().await? {
            if !is_answer_topic(&topic.name) {
                continue;
            }
            summary.examined += 1;

            let decision = self.policy.decide(&topic, now);
            if let SweepDecision::Unlabelled { action } = decision {
                warn!(
                    topic = %topic.name,
                    action = %action,
                    "Topic has no valid 'created' label; applying legacy action."
                );
            }

            if !decision.should_delete() {
                debug!(topic = %topic.name, ?decision, "Keeping topic.");
                summary.kept += 1;
                continue;
            }

            match self.topics.delete_topic(&topic.name).await {
                Ok(()) => {
                    summary.deleted += 1;
                    info!(topic = %topic.name, "Topic deleted.");
                }
                Err(TopicError::NotFound { .. }) => {
                    summary.already_deleted += 1;
                    info!(topic = %topic.name, "Topic already deleted.");
                }
                Err(error) => return Err(error),
            }
        }

        info!(
            examined = summary.examined,
            deleted = summary.deleted,
            already_deleted = summary.already_deleted,
            kept = summary.kept,
            "Topic sweep finished."
        );

        Ok(summary)
    }
}
