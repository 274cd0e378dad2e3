//! Artifact Registry implementation of [`ImageRegistry`].
//!
//! Docker image resource names look like
//! `projects/{p}/locations/{l}/repositories/{repo}/dockerImages/{name}@{digest}`
//! where `{name}` is percent-encoded (`octue%2Fexample-service`). Only the
//! decoded `{name}` is exposed to the domain.

use std::sync::Arc;

use async_trait::async_trait;
use events::{ImageRegistry, RegistryError, TaggedImage};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::TokenSource;
use crate::client::GoogleApiClient;
use crate::error::GcloudError;

/// Production Artifact Registry endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://artifactregistry.googleapis.com";

const PAGE_SIZE: &str = "1000";

/// Lists the Docker images of one repository.
#[derive(Debug, Clone)]
pub struct ArtifactRegistryImages {
    client: GoogleApiClient,
    repository: String,
    repository_id: String,
}

impl ArtifactRegistryImages {
    /// Creates a lister for `repository`, the full resource name
    /// `projects/{p}/locations/{l}/repositories/{id}`.
    pub fn new(repository: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Result<Self, GcloudError> {
        Self::with_endpoint(DEFAULT_ENDPOINT, repository, tokens)
    }

    pub fn with_endpoint(
        endpoint: impl Into<String>,
        repository: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, GcloudError> {
        let repository = repository.into().trim_matches('/').to_string();
        let repository_id = match repository.split('/').collect::<Vec<_>>().as_slice() {
            ["projects", project, "locations", location, "repositories", id]
                if !project.is_empty() && !location.is_empty() && !id.is_empty() =>
            {
                (*id).to_string()
            }
            _ => {
                return Err(GcloudError::configuration(format!(
                    "invalid repository '{repository}': expected \
                     'projects/{{project}}/locations/{{location}}/repositories/{{id}}'"
                )))
            }
        };

        Ok(Self {
            client: GoogleApiClient::new(endpoint, tokens)?,
            repository,
            repository_id,
        })
    }
}

#[async_trait]
impl ImageRegistry for ArtifactRegistryImages {
    async fn list_images(&self) -> Result<Vec<TaggedImage>, RegistryError> {
        let path = format!("/v1/{}/dockerImages", self.repository);
        let mut images = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", PAGE_SIZE)];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: ListDockerImagesResponse =
                self.client.get(&path, &query).await.map_err(api_error)?;
            debug!(count = page.docker_images.len(), "Fetched page of docker images.");

            for image in page.docker_images {
                match image_name(&image.name, &self.repository_id) {
                    Some(name) => images.push(TaggedImage::new(name, image.tags)),
                    None => warn!(resource = %image.name, "Skipping image with unexpected resource name."),
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(images)
    }
}

/// Extracts the decoded image name from a Docker image resource name.
///
/// Returns `None` if the resource name is not under
/// `{repository_id}/dockerImages/`.
pub fn image_name(resource: &str, repository_id: &str) -> Option<String> {
    let decoded = urlencoding::decode(resource).ok()?;
    let marker = format!("{repository_id}/dockerImages/");
    let (_, rest) = decoded.split_once(marker.as_str())?;
    let name = rest.split('@').next().unwrap_or(rest);

    (!name.is_empty()).then(|| name.to_string())
}

fn api_error(error: GcloudError) -> RegistryError {
    RegistryError::Api {
        message: error.to_string(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDockerImagesResponse {
    #[serde(default)]
    docker_images: Vec<DockerImage>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DockerImage {
    name: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPOSITORY_ID: &str = "octue-sdk-python";

    #[test]
    fn image_name_is_decoded_and_stripped_of_digest() {
        let resource = "projects/octue-sdk-python/locations/europe-west9/repositories/\
                        octue-sdk-python/dockerImages/octue%2Fexample-service@sha256:abc123";

        assert_eq!(
            image_name(resource, REPOSITORY_ID).as_deref(),
            Some("octue/example-service")
        );
    }

    #[test]
    fn image_name_without_digest() {
        let resource = "projects/p/locations/l/repositories/octue-sdk-python/dockerImages/octue%2Fsvc";

        assert_eq!(image_name(resource, REPOSITORY_ID).as_deref(), Some("octue/svc"));
    }

    #[test]
    fn image_in_other_repository_is_rejected() {
        let resource = "projects/p/locations/l/repositories/other/dockerImages/octue%2Fsvc@sha256:1";

        assert_eq!(image_name(resource, REPOSITORY_ID), None);
    }

    #[test]
    fn repository_must_be_a_full_resource_name() {
        let tokens: Arc<dyn TokenSource> = Arc::new(crate::StaticToken::new("t"));

        assert!(ArtifactRegistryImages::new("octue-sdk-python", tokens.clone()).is_err());
        assert!(ArtifactRegistryImages::new(
            "projects/p/locations/europe-west9/repositories/octue-sdk-python",
            tokens
        )
        .is_ok());
    }
}
