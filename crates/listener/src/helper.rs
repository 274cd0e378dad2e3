//! `POST /` receiver for scheduled maintenance triggers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use handlers::{HelperError, HelperOutcome, TopicSweeper};
use tracing::Instrument;

use crate::envelope::InboundEnvelope;
use crate::error::ApiError;
use crate::{health, invocation_span};

/// Builds the helper router.
pub fn helper_router(sweeper: Arc<TopicSweeper>) -> Router {
    Router::new()
        .route("/", post(receive_trigger))
        .route("/health", get(health))
        .with_state(sweeper)
}

async fn receive_trigger(
    State(sweeper): State<Arc<TopicSweeper>>,
    body: Bytes,
) -> Result<Json<HelperOutcome>, ApiError> {
    async move {
        let envelope = InboundEnvelope::parse(&body)?;

        match sweeper.handle(envelope.message()).await {
            Ok(outcome) => Ok(Json(outcome)),
            Err(error @ HelperError::Decode(_)) => Err(ApiError::bad_request(error.to_string())),
            Err(error @ HelperError::Topic(_)) => Err(ApiError::internal(error.to_string())),
        }
    }
    .instrument(invocation_span("helper"))
    .await
}
