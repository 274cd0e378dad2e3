//! Audit storage and job dispatch for service events.
//!
//! For every message: decode, store exactly one row, then
//!
//! - `question` → create one suspended job;
//! - `cancellation` → delete the job created for that question;
//! - anything else → nothing further.
//!
//! The row is written before any dispatch. If the write fails the invocation
//! fails and nothing is dispatched, so a job never exists without an audit
//! row for its message. Redelivery is left to the transport.

use std::sync::Arc;

use events::{
    DecodeError, DispatchError, EventKind, EventRow, EventStore, JobBuildError, JobDispatcher,
    JobName, JobSettings, PushMessage, QuestionJob, QuestionUuid, StoreError,
};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Errors that fail an event-handler invocation.
#[derive(Debug, Error)]
pub enum EventHandlerError {
    /// The message could not be decoded into an event and row.
    #[error("malformed message: {0}")]
    Decode(#[from] DecodeError),

    /// The row could not be stored. Nothing was dispatched.
    #[error("failed to store event row: {0}")]
    Store(#[from] StoreError),

    /// The question could not be shaped into a job. The row was stored.
    #[error("invalid question: {0}")]
    Job(#[from] JobBuildError),

    /// The job could not be created or deleted. The row was stored.
    #[error("failed to dispatch job: {0}")]
    Dispatch(#[from] DispatchError),
}

impl EventHandlerError {
    /// Returns `true` if the failure is caused by the message content rather
    /// than by an external system.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Job(_))
    }
}

/// What the handler did with the batch platform after storing the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// No job call was made.
    None,
    /// A suspended job was created.
    Created { job: String },
    /// A job was deleted.
    Deleted { job: String },
}

/// Summary of one successful invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandledEvent {
    pub message_id: String,
    pub kind: String,
    pub dispatch: DispatchOutcome,
}

/// A job dispatcher together with the settings applied to every job.
pub struct KueueDispatch {
    pub dispatcher: Arc<dyn JobDispatcher>,
    pub settings: JobSettings,
}

/// Stores service events and dispatches questions.
pub struct EventHandler {
    store: Arc<dyn EventStore>,
    dispatch: Option<KueueDispatch>,
}

impl EventHandler {
    /// Creates a handler that only stores rows.
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            dispatch: None,
        }
    }

    /// Enables job dispatch for questions and cancellations.
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: KueueDispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Handles one Pub/Sub message.
    ///
    /// # Errors
    ///
    /// Returns [`EventHandlerError`]; see its variants for whether the row
    /// was stored before the failure.
    pub async fn handle(&self, message: &PushMessage) -> Result<HandledEvent, EventHandlerError> {
        let decoded = message.decode()?;
        let row = EventRow::build(&decoded)?;

        info!(
            kind = %row.kind,
            message_id = %row.message_id(),
            question_uuid = %row.question_uuid,
            "Received event."
        );

        self.store.insert_row(&row).await?;
        info!(message_id = %row.message_id(), "Stored event row.");

        let dispatch = match (&self.dispatch, decoded.event.kind()) {
            (Some(kueue), EventKind::Question) => {
                let job = QuestionJob::build(&decoded.event, &decoded.attributes, &kueue.settings)?;
                kueue.dispatcher.create_job(&job).await?;

                info!(
                    recipient = %job.recipient,
                    question_uuid = %job.question_uuid,
                    job = %job.name,
                    "Dispatched question to Kueue."
                );

                DispatchOutcome::Created {
                    job: job.name.to_string(),
                }
            }
            (Some(kueue), EventKind::Cancellation) => {
                let question_uuid = QuestionUuid::new(row.question_uuid.clone()).ok_or_else(|| {
                    JobBuildError::MissingAttribute {
                        name: "question_uuid".to_string(),
                    }
                })?;
                let name = JobName::for_question(&question_uuid);
                kueue.dispatcher.delete_job(&name).await?;

                info!(question_uuid = %question_uuid, job = %name, "Cancelled question.");

                DispatchOutcome::Deleted {
                    job: name.to_string(),
                }
            }
            _ => DispatchOutcome::None,
        };

        Ok(HandledEvent {
            message_id: row.backend_metadata.message_id,
            kind: row.kind,
            dispatch,
        })
    }
}

#[cfg(test)]
mod tests {
    use events::testing::{RecordingEventStore, RecordingJobDispatcher};
    use events::{Attributes, ResourceRequests};
    use serde_json::{json, Value};

    use super::*;

    const QUESTION_UUID: &str = "ca534cdd-24cb-4ed2-af57-e36757192acb";

    fn attributes() -> Attributes {
        match json!({
            "datetime": "2024-04-11T09:26:39.144818",
            "uuid": "c8bda9fa-f072-4330-92b1-96920d06b28d",
            "parent": "octue/parent-test-service:5.6.3",
            "originator": "octue/ancestor-test-service:5.6.3",
            "sender": "octue/test-service:5.6.3",
            "sender_type": "PARENT",
            "sender_sdk_version": "1.0.3",
            "recipient": "octue/another-service:1.0.0",
            "question_uuid": QUESTION_UUID,
            "parent_question_uuid": "1d897229-155d-498d-b6ae-21960fab3754",
            "originator_question_uuid": "fb6cf9a3-84fb-45ce-a4da-0d2257bec319",
            "forward_logs": true
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn message(payload: &str) -> PushMessage {
        PushMessage::from_payload(payload.as_bytes(), attributes(), "1234")
    }

    struct Fixture {
        store: Arc<RecordingEventStore>,
        dispatcher: Arc<RecordingJobDispatcher>,
        handler: EventHandler,
    }

    fn fixture_with(store: RecordingEventStore, dispatcher: RecordingJobDispatcher) -> Fixture {
        let store = Arc::new(store);
        let dispatcher = Arc::new(dispatcher);
        let handler = EventHandler::new(store.clone()).with_dispatch(KueueDispatch {
            dispatcher: dispatcher.clone(),
            settings: JobSettings {
                queue_name: "test-queue".into(),
                services_topic: "test.octue.services".into(),
                registry_url: "some-artifact-registry-url".into(),
                default_resources: ResourceRequests::default(),
            },
        });
        Fixture {
            store,
            dispatcher,
            handler,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingEventStore::new(), RecordingJobDispatcher::new())
    }

    #[tokio::test]
    async fn other_kinds_are_stored_without_dispatch() {
        let f = fixture();

        for kind in ["heart", "result", "delivery_acknowledgement", "log_record"] {
            let handled = f
                .handler
                .handle(&message(&format!(r#"{{"kind": "{kind}", "some": "data"}}"#)))
                .await
                .unwrap();
            assert_eq!(handled.dispatch, DispatchOutcome::None);
        }

        assert_eq!(f.store.rows().len(), 4);
        assert!(f.dispatcher.created().is_empty());
        assert!(f.dispatcher.deleted().is_empty());
    }

    #[tokio::test]
    async fn stored_row_matches_message() {
        let f = fixture();

        f.handler
            .handle(&message(r#"{"kind": "heart", "some": "data"}"#))
            .await
            .unwrap();

        let row = &f.store.rows()[0];
        assert_eq!(row.kind, "heart");
        assert_eq!(row.event.get("some"), Some(&json!("data")));
        assert_eq!(row.other_attributes.get("forward_logs"), Some(&json!(true)));
        assert_eq!(row.other_attributes.len(), 1);
        assert_eq!(row.backend_metadata.message_id, "1234");
    }

    #[tokio::test]
    async fn question_creates_one_job() {
        let f = fixture();

        let handled = f
            .handler
            .handle(&message(r#"{"kind": "question", "input_values": {"some": "data"}}"#))
            .await
            .unwrap();

        let created = f.dispatcher.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name.as_str(), format!("question-{QUESTION_UUID}"));
        assert_eq!(
            handled.dispatch,
            DispatchOutcome::Created {
                job: format!("question-{QUESTION_UUID}")
            }
        );
        assert_eq!(f.store.rows().len(), 1);
    }

    #[tokio::test]
    async fn cancellation_deletes_the_question_job() {
        let f = fixture();

        f.handler
            .handle(&message(r#"{"kind": "question"}"#))
            .await
            .unwrap();
        f.handler
            .handle(&message(r#"{"kind": "cancellation"}"#))
            .await
            .unwrap();

        assert_eq!(f.dispatcher.deleted(), vec![f.dispatcher.created()[0].name.clone()]);
    }

    #[tokio::test]
    async fn storage_failure_prevents_dispatch() {
        let f = fixture_with(
            RecordingEventStore::failing(StoreError::Rejected {
                errors: vec!["no such field: kind".into()],
            }),
            RecordingJobDispatcher::new(),
        );

        let error = f
            .handler
            .handle(&message(r#"{"kind": "question"}"#))
            .await
            .unwrap_err();

        assert!(matches!(error, EventHandlerError::Store(_)));
        assert!(!error.is_malformed_input());
        assert!(f.dispatcher.created().is_empty());
    }

    #[tokio::test]
    async fn dispatch_failure_propagates_after_storing() {
        let f = fixture_with(
            RecordingEventStore::new(),
            RecordingJobDispatcher::failing(DispatchError::Api {
                message: "forbidden".into(),
            }),
        );

        let error = f
            .handler
            .handle(&message(r#"{"kind": "question"}"#))
            .await
            .unwrap_err();

        assert!(matches!(error, EventHandlerError::Dispatch(_)));
        assert_eq!(f.store.rows().len(), 1);
    }

    #[tokio::test]
    async fn dispatch_disabled_only_stores() {
        let store = Arc::new(RecordingEventStore::new());
        let handler = EventHandler::new(store.clone());

        let handled = handler
            .handle(&message(r#"{"kind": "question"}"#))
            .await
            .unwrap();

        assert_eq!(handled.dispatch, DispatchOutcome::None);
        assert_eq!(store.rows().len(), 1);
    }

    #[tokio::test]
    async fn malformed_message_stores_nothing() {
        let f = fixture();

        let error = f
            .handler
            .handle(&message(r#"{"no_kind": true}"#))
            .await
            .unwrap_err();

        assert!(error.is_malformed_input());
        assert!(f.store.rows().is_empty());
    }
}
