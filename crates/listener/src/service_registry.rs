//! `GET /{suid}` service-revision lookup.
//!
//! The SUID is the whole request path, percent-decoded and trimmed of
//! slashes, so `GET /my-org/my-service` and `GET /my-org%2Fmy-service` are
//! the same query.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use events::{LookupOutcome, RevisionQuery};
use handlers::ServiceRegistry;
use serde::Deserialize;
use serde_json::json;
use tracing::Instrument;

use crate::error::ApiError;
use crate::{health, invocation_span};

pub const NO_SERVICE_IDENTIFIER: &str = "No service identifier was provided.";
pub const REVISION_DOES_NOT_EXIST: &str = "Service revision does not exist";

/// Builds the service-registry router.
pub fn service_registry_router(registry: Arc<ServiceRegistry>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(lookup))
        .route("/{*suid}", get(lookup))
        .with_state(registry)
}

#[derive(Debug, Default, Deserialize)]
struct LookupParams {
    revision_tag: Option<String>,
}

async fn lookup(
    State(registry): State<Arc<ServiceRegistry>>,
    uri: Uri,
    Query(params): Query<LookupParams>,
) -> Result<Response, ApiError> {
    async move {
        let suid = suid_from_path(uri.path())?;
        let query = RevisionQuery::new(&suid, params.revision_tag.as_deref())
            .map_err(|_| ApiError::bad_request(NO_SERVICE_IDENTIFIER))?;

        let outcome = registry
            .lookup(&query)
            .await
            .map_err(|error| ApiError::internal(error.to_string()))?;

        match outcome {
            LookupOutcome::RevisionExists => Ok(String::new().into_response()),
            LookupOutcome::RevisionMissing => Err(ApiError::not_found(REVISION_DOES_NOT_EXIST)),
            LookupOutcome::DefaultRevision { revision_tag } => {
                Ok(Json(json!({ "revision_tag": revision_tag })).into_response())
            }
            LookupOutcome::NoDefaultRevision => Err(ApiError::not_found(format!(
                "No default service revision found for '{suid}'."
            ))),
        }
    }
    .instrument(invocation_span("service-registry"))
    .await
}

fn suid_from_path(path: &str) -> Result<String, ApiError> {
    let decoded = urlencoding::decode(path)
        .map_err(|_| ApiError::bad_request("request path is not valid UTF-8"))?;
    Ok(decoded.trim_matches('/').to_string())
}
