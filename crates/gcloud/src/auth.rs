//! Access tokens for Google Cloud API calls.

use std::sync::Arc;

use async_trait::async_trait;
use gcp_auth::TokenProvider;

use crate::error::GcloudError;

/// OAuth scope granting access to every Google Cloud API.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Supplies bearer tokens for outgoing requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns a currently valid access token.
    async fn access_token(&self) -> Result<String, GcloudError>;
}

/// Tokens from Google application default credentials.
///
/// Caching and refresh are handled by `gcp_auth`.
#[derive(Clone)]
pub struct ApplicationDefaultCredentials {
    provider: Arc<dyn TokenProvider>,
}

impl ApplicationDefaultCredentials {
    /// Discovers credentials from the environment.
    ///
    /// Tries, in order: `GOOGLE_APPLICATION_CREDENTIALS`, gcloud user
    /// credentials, and the instance metadata server.
    pub async fn discover() -> Result<Self, GcloudError> {
        let provider = gcp_auth::provider().await.map_err(auth_error)?;
        Ok(Self { provider })
    }

    /// Returns the project the credentials belong to.
    pub async fn project_id(&self) -> Result<String, GcloudError> {
        let project = self.provider.project_id().await.map_err(auth_error)?;
        Ok(project.to_string())
    }
}

#[async_trait]
impl TokenSource for ApplicationDefaultCredentials {
    async fn access_token(&self) -> Result<String, GcloudError> {
        let token = self
            .provider
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(auth_error)?;
        Ok(token.as_str().to_string())
    }
}

impl std::fmt::Debug for ApplicationDefaultCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationDefaultCredentials")
            .finish_non_exhaustive()
    }
}

/// A fixed token, for emulators and tests.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, GcloudError> {
        Ok(self.0.clone())
    }
}

fn auth_error(error: gcp_auth::Error) -> GcloudError {
    GcloudError::Auth {
        message: error.to_string(),
    }
}
