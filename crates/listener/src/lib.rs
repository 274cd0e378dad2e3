//! HTTP receivers for the Twined functions.
//!
//! Each function is an independent axum [`Router`](axum::Router); the `cli`
//! binary serves exactly one of them.
//!
//! | Router | Routes | Handler |
//! |--------|--------|---------|
//! | [`event_handler_router`] | `POST /` | [`handlers::EventHandler`] |
//! | [`helper_router`] | `POST /` | [`handlers::TopicSweeper`] |
//! | [`service_registry_router`] | `GET /{suid}?revision_tag=` | [`handlers::ServiceRegistry`] |
//!
//! All routers also answer `GET /health`.
//!
//! ## Status codes
//!
//! Pub/Sub treats any non-2xx response as a nack and redelivers. Malformed
//! input answers `400`, infrastructure failures `500`, registry misses `404`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Envelope parsing, status mapping and per-request spans
//! live here. The `handlers` crate knows nothing about HTTP.

pub mod envelope;
pub mod error;
pub mod event_handler;
pub mod helper;
pub mod service_registry;

use axum::Json;
use serde_json::{json, Value};
use tracing::{info_span, Span};

use events::InvocationId;

pub use envelope::InboundEnvelope;
pub use error::ApiError;
pub use event_handler::event_handler_router;
pub use helper::helper_router;
pub use service_registry::service_registry_router;

/// `GET /health`.
pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Opens the span covering one function invocation.
pub(crate) fn invocation_span(function: &'static str) -> Span {
    let invocation_id = InvocationId::new_random();
    info_span!("invocation", function, invocation_id = %invocation_id)
}
