//! Authenticated JSON client shared by the REST adapters.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::auth::TokenSource;
use crate::error::GcloudError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends bearer-authenticated JSON requests to one API endpoint.
#[derive(Clone)]
pub struct GoogleApiClient {
    http: Client,
    tokens: Arc<dyn TokenSource>,
    endpoint: String,
}

impl GoogleApiClient {
    /// Creates a client for `endpoint` (scheme and host, no trailing slash).
    ///
    /// # Errors
    ///
    /// Returns [`GcloudError::Http`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Result<Self, GcloudError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            tokens,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    /// `GET {endpoint}{path}` with query parameters, decoding the JSON body.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, GcloudError> {
        let request = self.http.get(self.url(path)).query(query);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// `POST {endpoint}{path}` with a JSON body, decoding the JSON response.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GcloudError> {
        let request = self
            .http
            .post(self.url(path))
            .body(serde_json::to_vec(body)?)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// `DELETE {endpoint}{path}`, ignoring the response body.
    pub async fn delete(&self, path: &str) -> Result<(), GcloudError> {
        let request = self.http.delete(self.url(path));
        self.send(request).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GcloudError> {
        let token = self.tokens.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %body, "Google Cloud API returned an error.");
        Err(GcloudError::from_response_body(status.as_u16(), &body))
    }
}

impl std::fmt::Debug for GoogleApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleApiClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
