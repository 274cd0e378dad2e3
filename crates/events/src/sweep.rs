//! Retention rules for answer topics.
//!
//! Services create a topic per question to carry answers back to the asker.
//! These topics are labelled with their creation time (`created`, POSIX
//! seconds) and are deleted by a periodic sweep once older than the
//! retention window. Topics created before labelling existed follow a
//! configurable legacy policy.

use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::errors::DecodeError;
use crate::message::Attributes;
use crate::types::{Timestamp, Topic};

/// Substring every services topic name contains.
pub const SERVICES_TOPIC_MARKER: &str = "octue.services";

/// Substring every answer topic name contains.
pub const ANSWERS_TOPIC_MARKER: &str = ".answers.";

/// Label holding a topic's creation time in POSIX seconds.
pub const CREATED_LABEL: &str = "created";

/// Default retention window: one week.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(604_800);

/// Returns `true` if the topic name follows the answer-topic naming convention.
pub fn is_answer_topic(name: &str) -> bool {
    name.contains(ANSWERS_TOPIC_MARKER) && name.contains(SERVICES_TOPIC_MARKER)
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Maintenance action requested through the helper's `action` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaintenanceAction {
    /// Delete expired answer topics.
    ClearTopics,
    /// An action this deployment does not know; acknowledged without effect.
    Other(String),
}

impl MaintenanceAction {
    /// Attribute carrying the action name.
    pub const ATTRIBUTE: &'static str = "action";

    /// Reads the action from message attributes.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::MissingAttribute`] if there is no string
    /// `action` attribute.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self, DecodeError> {
        match attributes.get(Self::ATTRIBUTE).and_then(|v| v.as_str()) {
            Some("clear-topics") => Ok(Self::ClearTopics),
            Some(other) => Ok(Self::Other(other.to_string())),
            None => Err(DecodeError::MissingAttribute {
                name: Self::ATTRIBUTE.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// What to do with an answer topic that has no valid `created` label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyTopicAction {
    /// Leave the topic in place.
    #[default]
    Keep,
    /// Delete the topic.
    Delete,
}

impl FromStr for LegacyTopicAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "delete" => Ok(Self::Delete),
            other => Err(format!(
                "unknown legacy topic action '{other}' (expected 'keep' or 'delete')"
            )),
        }
    }
}

impl std::fmt::Display for LegacyTopicAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keep => f.write_str("keep"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// The outcome of applying the retention policy to one topic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SweepDecision {
    /// Older than the retention window.
    Expired {
        /// Age in seconds.
        age_seconds: f64,
    },
    /// Within the retention window.
    Fresh {
        /// Age in seconds.
        age_seconds: f64,
    },
    /// No valid `created` label; the legacy policy applies.
    Unlabelled {
        /// The configured legacy action.
        action: LegacyTopicAction,
    },
}

impl SweepDecision {
    /// Returns `true` if the topic should be deleted.
    pub fn should_delete(&self) -> bool {
        match self {
            Self::Expired { .. } => true,
            Self::Fresh { .. } => false,
            Self::Unlabelled { action } => *action == LegacyTopicAction::Delete,
        }
    }
}

/// Retention settings for the sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPolicy {
    /// Topics older than this are deleted.
    pub retention: Duration,
    /// Policy for topics without a valid `created` label.
    pub legacy_action: LegacyTopicAction,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            legacy_action: LegacyTopicAction::Keep,
        }
    }
}

impl SweepPolicy {
    /// Decides the fate of `topic` at time `now`.
    pub fn decide(&self, topic: &Topic, now: Timestamp) -> SweepDecision {
        let created = topic
            .labels
            .get(CREATED_LABEL)
            .and_then(|label| label.trim().parse::<f64>().ok())
            .filter(|seconds| seconds.is_finite());

        match created {
            Some(created) => {
                let age_seconds = now.as_unix_seconds() - created;
                if age_seconds > self.retention.as_secs_f64() {
                    SweepDecision::Expired { age_seconds }
                } else {
                    SweepDecision::Fresh { age_seconds }
                }
            }
            None => SweepDecision::Unlabelled {
                action: self.legacy_action,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Counts reported at the end of a sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    /// Answer topics examined.
    pub examined: usize,
    /// Topics deleted by this sweep.
    pub deleted: usize,
    /// Topics found already deleted (by a concurrent sweep).
    pub already_deleted: usize,
    /// Topics left in place.
    pub kept: usize,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn now() -> Timestamp {
        Timestamp::from_unix_seconds(NOW).unwrap()
    }

    fn topic_created_at(seconds: impl ToString) -> Topic {
        Topic::new("projects/p/topics/octue.services.my-org.my-service.answers.q1")
            .with_label(CREATED_LABEL, seconds.to_string())
    }

    #[test]
    fn answer_topic_naming_convention() {
        assert!(is_answer_topic("projects/p/topics/octue.services.a.answers.q"));
        assert!(!is_answer_topic("projects/p/topics/octue.services.a"));
        assert!(!is_answer_topic("projects/p/topics/other.answers.q"));
    }

    #[test]
    fn topic_older_than_retention_expires() {
        let policy = SweepPolicy::default();
        let created = NOW - 604_801;

        let decision = policy.decide(&topic_created_at(created), now());

        assert!(decision.should_delete());
        assert!(matches!(decision, SweepDecision::Expired { .. }));
    }

    #[test]
    fn topic_within_retention_is_kept() {
        let policy = SweepPolicy::default();

        let decision = policy.decide(&topic_created_at(NOW - 604_800), now());

        assert!(!decision.should_delete());
    }

    #[test]
    fn fractional_created_label_is_accepted() {
        let policy = SweepPolicy {
            retention: Duration::from_secs(10),
            ..SweepPolicy::default()
        };

        let decision = policy.decide(&topic_created_at("1699999980.5"), now());

        assert!(decision.should_delete());
    }

    #[test]
    fn unlabelled_topics_follow_legacy_policy() {
        let unlabelled = Topic::new("projects/p/topics/octue.services.a.answers.q");
        let invalid = topic_created_at("yesterday");

        let keep = SweepPolicy::default();
        let delete = SweepPolicy {
            legacy_action: LegacyTopicAction::Delete,
            ..SweepPolicy::default()
        };

        for topic in [&unlabelled, &invalid] {
            assert!(!keep.decide(topic, now()).should_delete());
            assert!(delete.decide(topic, now()).should_delete());
        }
    }

    #[test]
    fn legacy_action_parses_case_insensitively() {
        assert_eq!("DELETE".parse::<LegacyTopicAction>(), Ok(LegacyTopicAction::Delete));
        assert_eq!("keep".parse::<LegacyTopicAction>(), Ok(LegacyTopicAction::Keep));
        assert!("archive".parse::<LegacyTopicAction>().is_err());
    }

    #[test]
    fn action_is_read_from_attributes() {
        let attributes = |value: serde_json::Value| value.as_object().cloned().unwrap();

        assert_eq!(
            MaintenanceAction::from_attributes(&attributes(json!({"action": "clear-topics"})))
                .unwrap(),
            MaintenanceAction::ClearTopics
        );
        assert_eq!(
            MaintenanceAction::from_attributes(&attributes(json!({"action": "other"}))).unwrap(),
            MaintenanceAction::Other("other".into())
        );
        assert!(MaintenanceAction::from_attributes(&attributes(json!({}))).is_err());
    }
}
