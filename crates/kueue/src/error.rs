//! Errors raised while building the Kubernetes client.

use thiserror::Error;

/// Failure to set up the Kubernetes client.
#[derive(Debug, Error)]
pub enum KueueError {
    /// No usable kubeconfig or in-cluster configuration was found.
    #[error("failed to load Kubernetes configuration: {message}")]
    Config {
        /// Description of the failure.
        message: String,
    },

    /// The client could not be built from the configuration.
    #[error("failed to create Kubernetes client: {0}")]
    Client(#[from] kube::Error),
}
