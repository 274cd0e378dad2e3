//! Service-revision existence and default-revision lookup.

use std::sync::Arc;

use events::{ImageRegistry, LookupOutcome, RegistryError, RevisionQuery};
use tracing::info;

/// Answers registry queries from the images in one artifact repository.
pub struct ServiceRegistry {
    images: Arc<dyn ImageRegistry>,
}

impl ServiceRegistry {
    pub fn new(images: Arc<dyn ImageRegistry>) -> Self {
        Self { images }
    }

    /// Looks up a service revision, or the service's default revision when
    /// the query has no revision tag.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the repository cannot be listed.
    pub async fn lookup(&self, query: &RevisionQuery) -> Result<LookupOutcome, RegistryError> {
        let images = self.images.list_images().await?;
        let outcome = LookupOutcome::resolve(&images, query);

        info!(
            suid = %query.suid,
            revision_tag = query.revision_tag.as_ref().map(|tag| tag.as_str()),
            images = images.len(),
            ?outcome,
            "Resolved service revision query."
        );

        Ok(outcome)
    }
}
