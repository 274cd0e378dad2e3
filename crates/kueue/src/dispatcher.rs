//! [`JobDispatcher`] over the Kubernetes Jobs API.

use async_trait::async_trait;
use events::{DispatchError, JobDispatcher, JobName, QuestionJob};
use k8s_openapi::api::batch::v1::Job;
use kube::api::{DeleteParams, PostParams};
use kube::config::KubeConfigOptions;
use kube::{Api, Client, Config};
use tracing::{info, instrument};

use crate::error::KueueError;
use crate::job::to_kubernetes_job;

/// Creates and deletes question jobs in one namespace.
#[derive(Clone)]
pub struct KueueDispatcher {
    jobs: Api<Job>,
    namespace: String,
}

impl KueueDispatcher {
    /// Connects to the cluster.
    ///
    /// With a `context`, that kubeconfig context is used; otherwise the
    /// configuration is inferred (in-cluster service account, then the
    /// current kubeconfig context).
    ///
    /// # Errors
    ///
    /// Returns [`KueueError`] if no configuration can be loaded or the client
    /// cannot be built.
    pub async fn connect(context: Option<&str>, namespace: &str) -> Result<Self, KueueError> {
        let config = match context {
            Some(context) => {
                let options = KubeConfigOptions {
                    context: Some(context.to_string()),
                    ..Default::default()
                };
                Config::from_kubeconfig(&options)
                    .await
                    .map_err(|error| KueueError::Config {
                        message: error.to_string(),
                    })?
            }
            None => Config::infer().await.map_err(|error| KueueError::Config {
                message: error.to_string(),
            })?,
        };

        let client = Client::try_from(config)?;
        Ok(Self::new(client, namespace))
    }

    /// Wraps an existing client.
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            jobs: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[async_trait]
impl JobDispatcher for KueueDispatcher {
    #[instrument(skip_all, fields(job = %job.name.as_str(), namespace = %self.namespace))]
    async fn create_job(&self, job: &QuestionJob) -> Result<(), DispatchError> {
        self.jobs
            .create(&PostParams::default(), &to_kubernetes_job(job))
            .await
            .map_err(|error| map_error(error, job.name.as_str()))?;

        info!(queue = ?job.labels.get(events::job::QUEUE_NAME_LABEL), "Job created.");
        Ok(())
    }

    #[instrument(skip_all, fields(job = %name.as_str(), namespace = %self.namespace))]
    async fn delete_job(&self, name: &JobName) -> Result<(), DispatchError> {
        self.jobs
            .delete(name.as_str(), &DeleteParams::background())
            .await
            .map_err(|error| map_error(error, name.as_str()))?;

        info!("Job deleted.");
        Ok(())
    }
}

fn map_error(error: kube::Error, name: &str) -> DispatchError {
    match error {
        kube::Error::Api(response) if response.code == 409 => DispatchError::AlreadyExists {
            name: name.to_string(),
        },
        kube::Error::Api(response) if response.code == 404 => DispatchError::NotFound {
            name: name.to_string(),
        },
        other => DispatchError::Api {
            message: other.to_string(),
        },
    }
}

impl std::fmt::Debug for KueueDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KueueDispatcher")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use kube::core::ErrorResponse;

    use super::*;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: "boom".into(),
            reason: "Test".into(),
            code,
        })
    }

    #[test]
    fn conflict_maps_to_already_exists() {
        assert_eq!(
            map_error(api_error(409), "question-1"),
            DispatchError::AlreadyExists {
                name: "question-1".into()
            }
        );
    }

    #[test]
    fn missing_maps_to_not_found() {
        assert_eq!(
            map_error(api_error(404), "question-1"),
            DispatchError::NotFound {
                name: "question-1".into()
            }
        );
    }

    #[test]
    fn other_failures_are_api_errors() {
        assert!(matches!(
            map_error(api_error(500), "question-1"),
            DispatchError::Api { .. }
        ));
    }
}
