use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use events::testing::{
    InMemoryTopicAdmin, RecordingEventStore, RecordingJobDispatcher, StaticImageRegistry,
};
use events::{JobSettings, ResourceRequests, StoreError, TaggedImage, Topic};
use handlers::{EventHandler, KueueDispatch, ServiceRegistry, TopicSweeper};
use listener::{event_handler_router, helper_router, service_registry_router};
use serde_json::{json, Value};
use tower::ServiceExt;

const QUESTION_UUID: &str = "fb6cf9a3-84fb-45ce-a4da-0d2257bec319";

fn attributes() -> Value {
    json!({
        "datetime": "2024-04-11T09:26:39.144818",
        "uuid": "c8bda9fa-f072-4330-92b1-96920d06b28d",
        "parent": "octue/parent-test-service:5.6.3",
        "originator": "octue/ancestor-test-service:5.6.3",
        "sender": "octue/test-service:5.6.3",
        "sender_type": "PARENT",
        "sender_sdk_version": "1.0.3",
        "recipient": "octue/example-service:1.2.0",
        "question_uuid": QUESTION_UUID,
        "parent_question_uuid": "1d897229-155d-498d-b6ae-21960fab3754",
        "originator_question_uuid": "fb6cf9a3-84fb-45ce-a4da-0d2257bec319",
    })
}

fn push_body(event: Value, attributes: Value) -> String {
    json!({
        "message": {
            "data": STANDARD.encode(event.to_string()),
            "attributes": attributes,
            "messageId": "1234",
            "publishTime": "2024-04-11T09:26:39.144Z"
        },
        "subscription": "projects/my-project/subscriptions/octue.services"
    })
    .to_string()
}

fn post(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

struct EventHandlerApp {
    app: Router,
    store: Arc<RecordingEventStore>,
    dispatcher: Arc<RecordingJobDispatcher>,
}

fn event_handler_app(store: RecordingEventStore) -> EventHandlerApp {
    let store = Arc::new(store);
    let dispatcher = Arc::new(RecordingJobDispatcher::new());
    let handler = EventHandler::new(store.clone()).with_dispatch(KueueDispatch {
        dispatcher: dispatcher.clone(),
        settings: JobSettings {
            queue_name: "investigations".into(),
            services_topic: "octue.services".into(),
            registry_url: "europe-west9-docker.pkg.dev/my-project/service-images".into(),
            default_resources: ResourceRequests::default(),
        },
    });

    EventHandlerApp {
        app: event_handler_router(Arc::new(handler)),
        store,
        dispatcher,
    }
}

// ---------------------------------------------------------------------------
// Event handler
// ---------------------------------------------------------------------------

#[tokio::test]
async fn question_is_stored_and_dispatched() {
    let app = event_handler_app(RecordingEventStore::new());

    let (status, body) = send(
        app.app,
        post(push_body(json!({"kind": "question", "input_values": {"n": 1}}), attributes())),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["dispatch"]["action"], "created");
    assert_eq!(body["dispatch"]["job"], format!("question-{QUESTION_UUID}"));
    assert_eq!(app.store.rows().len(), 1);
    assert_eq!(app.dispatcher.created().len(), 1);
}

#[tokio::test]
async fn cancellation_deletes_the_job() {
    let app = event_handler_app(RecordingEventStore::new());

    let (status, _) = send(app.app, post(push_body(json!({"kind": "cancellation"}), attributes()))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.dispatcher.deleted().len(), 1);
    assert_eq!(
        app.dispatcher.deleted()[0].as_str(),
        format!("question-{QUESTION_UUID}")
    );
}

#[tokio::test]
async fn other_events_are_only_stored() {
    let app = event_handler_app(RecordingEventStore::new());

    let (status, _) = send(app.app, post(push_body(json!({"kind": "heartbeat"}), attributes()))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.rows().len(), 1);
    assert!(app.dispatcher.created().is_empty());
    assert!(app.dispatcher.deleted().is_empty());
}

#[tokio::test]
async fn structured_cloud_event_is_accepted() {
    let app = event_handler_app(RecordingEventStore::new());
    let envelope: Value =
        serde_json::from_str(&push_body(json!({"kind": "heartbeat"}), attributes())).unwrap();
    let body = json!({
        "specversion": "1.0",
        "type": "google.cloud.pubsub.topic.v1.messagePublished",
        "source": "//pubsub.googleapis.com/projects/my-project/topics/octue.services",
        "id": "1234",
        "data": envelope,
    });

    let (status, _) = send(app.app, post(body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.rows().len(), 1);
}

#[tokio::test]
async fn missing_attribute_is_bad_request() {
    let app = event_handler_app(RecordingEventStore::new());
    let mut attributes = attributes();
    attributes.as_object_mut().unwrap().remove("sender");

    let (status, body) = send(app.app, post(push_body(json!({"kind": "heartbeat"}), attributes))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("sender"), "{body}");
    assert!(app.store.rows().is_empty());
}

#[tokio::test]
async fn non_envelope_body_is_bad_request() {
    let app = event_handler_app(RecordingEventStore::new());

    let (status, _) = send(app.app, post("{\"hello\": 1}".into())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn storage_failure_is_server_error_and_nothing_is_dispatched() {
    let app = event_handler_app(RecordingEventStore::failing(StoreError::Rejected {
        errors: vec!["no such field".into()],
    }));

    let (status, body) = send(
        app.app,
        post(push_body(json!({"kind": "question"}), attributes())),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("no such field"), "{body}");
    assert!(app.dispatcher.created().is_empty());
}

#[tokio::test]
async fn health_check() {
    let app = event_handler_app(RecordingEventStore::new());

    let (status, body) = send(app.app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({"status": "ok"}));
}

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

fn helper_app(admin: Arc<InMemoryTopicAdmin>) -> Router {
    helper_router(Arc::new(TopicSweeper::new(admin, Default::default())))
}

fn trigger(attributes: Value) -> String {
    json!({"message": {"data": STANDARD.encode("{}"), "attributes": attributes, "messageId": "1"}})
        .to_string()
}

#[tokio::test]
async fn clear_topics_sweeps() {
    let old = "projects/p/topics/octue.services.my-org.my-service.answers.1";
    let admin = Arc::new(InMemoryTopicAdmin::new(vec![
        Topic::new(old).with_label("created", "0")
    ]));

    let (status, body) = send(helper_app(admin.clone()), post(trigger(json!({"action": "clear-topics"})))).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["outcome"], "swept");
    assert_eq!(body["deleted"], 1);
    assert_eq!(admin.deleted(), vec![old.to_string()]);
}

#[tokio::test]
async fn unknown_action_is_acknowledged() {
    let admin = Arc::new(InMemoryTopicAdmin::new(Vec::new()));

    let (status, body) = send(helper_app(admin), post(trigger(json!({"action": "reindex"})))).await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({"outcome": "ignored", "action": "reindex"}));
}

#[tokio::test]
async fn missing_action_is_bad_request() {
    let admin = Arc::new(InMemoryTopicAdmin::new(Vec::new()));

    let (status, _) = send(helper_app(admin), post(trigger(json!({})))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_delete_is_server_error() {
    let name = "projects/p/topics/octue.services.my-org.my-service.answers.1";
    let admin = Arc::new(
        InMemoryTopicAdmin::new(vec![Topic::new(name).with_label("created", "0")]).with_failing(name),
    );

    let (status, _) = send(helper_app(admin), post(trigger(json!({"action": "clear-topics"})))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

// ---------------------------------------------------------------------------
// Service registry
// ---------------------------------------------------------------------------

const SUID: &str = "my-org/my-service";

fn registry_app(images: Vec<TaggedImage>) -> Router {
    service_registry_router(Arc::new(ServiceRegistry::new(Arc::new(
        StaticImageRegistry::new(images),
    ))))
}

#[tokio::test]
async fn existing_revision_is_ok_with_empty_body() {
    let app = registry_app(vec![TaggedImage::new(SUID, ["0.1.0"])]);

    let (status, body) = send(app, get("/my-org/my-service?revision_tag=0.1.0")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "");
}

#[tokio::test]
async fn percent_encoded_suid_is_accepted() {
    let app = registry_app(vec![TaggedImage::new(SUID, ["0.1.0"])]);

    let (status, _) = send(app, get("/my-org%2Fmy-service?revision_tag=0.1.0")).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_revision_is_not_found() {
    let app = registry_app(vec![TaggedImage::new(SUID, ["0.1.0"])]);

    let (status, body) = send(app, get("/my-org/my-service?revision_tag=0.2.0")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Service revision does not exist");
}

#[tokio::test]
async fn default_revision_tag_is_returned() {
    let app = registry_app(vec![TaggedImage::new(SUID, ["default", "0.1.0"])]);

    let (status, body) = send(app, get("/my-org/my-service")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({"revision_tag": "0.1.0"})
    );
}

#[tokio::test]
async fn no_default_revision_is_not_found() {
    let app = registry_app(vec![TaggedImage::new(SUID, ["0.1.0"])]);

    let (status, body) = send(app, get("/my-org/my-service")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "No default service revision found for 'my-org/my-service'.");
}

#[tokio::test]
async fn empty_suid_is_bad_request() {
    let app = registry_app(Vec::new());

    let (status, body) = send(app, get("/")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "No service identifier was provided.");
}
