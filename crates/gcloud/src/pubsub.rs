//! Pub/Sub implementation of [`TopicAdmin`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use events::{Topic, TopicAdmin, TopicError};
use serde::Deserialize;
use tracing::debug;

use crate::auth::TokenSource;
use crate::client::GoogleApiClient;
use crate::error::GcloudError;

/// Production Pub/Sub endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://pubsub.googleapis.com";

const PAGE_SIZE: &str = "1000";

/// Lists and deletes the topics of one project.
#[derive(Debug, Clone)]
pub struct PubSubTopicAdmin {
    client: GoogleApiClient,
    project: String,
}

impl PubSubTopicAdmin {
    pub fn new(project: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Result<Self, GcloudError> {
        Self::with_endpoint(DEFAULT_ENDPOINT, project, tokens)
    }

    pub fn with_endpoint(
        endpoint: impl Into<String>,
        project: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, GcloudError> {
        let project = project.into();
        if project.is_empty() {
            return Err(GcloudError::configuration("Pub/Sub project must not be empty"));
        }

        Ok(Self {
            client: GoogleApiClient::new(endpoint, tokens)?,
            project,
        })
    }
}

#[async_trait]
impl TopicAdmin for PubSubTopicAdmin {
    async fn list_topics(&self) -> Result<Vec<Topic>, TopicError> {
        let path = format!("/v1/projects/{}/topics", self.project);
        let mut topics = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", PAGE_SIZE)];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: ListTopicsResponse = self.client.get(&path, &query).await.map_err(api_error)?;
            debug!(count = page.topics.len(), "Fetched page of topics.");
            topics.extend(page.topics.into_iter().map(|topic| Topic {
                name: topic.name,
                labels: topic.labels,
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(topics)
    }

    async fn delete_topic(&self, name: &str) -> Result<(), TopicError> {
        match self.client.delete(&format!("/v1/{name}")).await {
            Ok(()) => Ok(()),
            Err(error) if error.is_not_found() => Err(TopicError::NotFound {
                topic: name.to_string(),
            }),
            Err(error) => Err(api_error(error)),
        }
    }
}

fn api_error(error: GcloudError) -> TopicError {
    TopicError::Api {
        message: error.to_string(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListTopicsResponse {
    #[serde(default)]
    topics: Vec<TopicResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TopicResource {
    name: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}
