//! Service-revision lookup over tagged images.
//!
//! Every service revision is published as an image named after its SUID and
//! tagged with its revision tag. The revision a service runs when asked
//! without a tag is the image additionally tagged `default`.

use crate::errors::IdentifierError;
use crate::identifiers::{RevisionTag, Suid};
use crate::types::TaggedImage;

/// Tag marking a service's default revision.
pub const DEFAULT_REVISION_TAG: &str = "default";

/// Floating tag that never names a concrete revision.
pub const LATEST_TAG: &str = "latest";

/// A registry query: a service, optionally narrowed to one revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionQuery {
    pub suid: Suid,
    pub revision_tag: Option<RevisionTag>,
}

impl RevisionQuery {
    /// Builds a query from raw request values.
    ///
    /// An empty revision tag is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::Empty`] if `suid` is empty.
    pub fn new(suid: &str, revision_tag: Option<&str>) -> Result<Self, IdentifierError> {
        let suid = Suid::new(suid).ok_or(IdentifierError::Empty {
            kind: "service identifier",
        })?;

        Ok(Self {
            suid,
            revision_tag: revision_tag.and_then(RevisionTag::new),
        })
    }
}

/// Result of a registry query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// An image `{suid}:{tag}` exists.
    RevisionExists,
    /// No image `{suid}:{tag}` exists.
    RevisionMissing,
    /// The default revision exists and carries this concrete tag.
    DefaultRevision {
        revision_tag: String,
    },
    /// The service has no image tagged `default`.
    NoDefaultRevision,
}

impl LookupOutcome {
    /// Answers `query` against the full list of repository images.
    pub fn resolve(images: &[TaggedImage], query: &RevisionQuery) -> Self {
        let mut service_images = images
            .iter()
            .filter(|image| image.name == query.suid.as_str() && !image.tags.is_empty());

        match &query.revision_tag {
            Some(tag) => {
                if service_images.any(|image| image.has_tag(tag.as_str())) {
                    Self::RevisionExists
                } else {
                    Self::RevisionMissing
                }
            }
            None => match service_images.find(|image| image.has_tag(DEFAULT_REVISION_TAG)) {
                Some(image) => Self::DefaultRevision {
                    revision_tag: concrete_tag(image),
                },
                None => Self::NoDefaultRevision,
            },
        }
    }
}

/// Picks the first tag naming a concrete revision, falling back to `default`.
fn concrete_tag(image: &TaggedImage) -> String {
    image
        .tags
        .iter()
        .find(|tag| tag.as_str() != DEFAULT_REVISION_TAG && tag.as_str() != LATEST_TAG)
        .cloned()
        .unwrap_or_else(|| DEFAULT_REVISION_TAG.to_string())
}
