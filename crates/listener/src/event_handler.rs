//! `POST /` receiver for service events.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use handlers::{EventHandler, EventHandlerError, HandledEvent};
use tracing::{info, Instrument};

use crate::envelope::InboundEnvelope;
use crate::error::ApiError;
use crate::{health, invocation_span};

/// Builds the event-handler router.
pub fn event_handler_router(handler: Arc<EventHandler>) -> Router {
    Router::new()
        .route("/", post(receive_event))
        .route("/health", get(health))
        .with_state(handler)
}

async fn receive_event(
    State(handler): State<Arc<EventHandler>>,
    body: Bytes,
) -> Result<Json<HandledEvent>, ApiError> {
    async move {
        let envelope = InboundEnvelope::parse(&body)?;
        if let Some(subscription) = envelope.subscription() {
            info!(subscription, "Received push request.");
        }

        let handled = handler
            .handle(envelope.message())
            .await
            .map_err(handler_error)?;

        Ok(Json(handled))
    }
    .instrument(invocation_span("event-handler"))
    .await
}

fn handler_error(error: EventHandlerError) -> ApiError {
    if error.is_malformed_input() {
        ApiError::bad_request(error.to_string())
    } else {
        ApiError::internal(error.to_string())
    }
}
