//! Shaping a question event into a suspended batch job.
//!
//! A question becomes exactly one single-container Job. The Job is created
//! suspended and labelled with a Kueue local queue; Kueue admits it when the
//! queue has capacity. Nothing here schedules, retries, or tracks the Job.
//!
//! [`QuestionJob`] is a platform-neutral description; the `kueue` crate turns
//! it into a Kubernetes object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::JobBuildError;
use crate::identifiers::{JobName, QuestionUuid, Sruid};
use crate::message::{Attributes, Event};

/// Label through which Kueue assigns a Job to a local queue.
pub const QUEUE_NAME_LABEL: &str = "kueue.x-k8s.io/queue-name";

/// Value of `COMPUTE_PROVIDER` in the job environment.
pub const COMPUTE_PROVIDER: &str = "GOOGLE_KUEUE";

/// Command run by the question container.
pub const QUESTION_COMMAND: [&str; 4] = ["octue", "question", "ask", "local"];

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Resource requests for the question container, as Kubernetes quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequests {
    /// CPU request (e.g. `"2"`, `"500m"`).
    pub cpu: String,
    /// Memory request (e.g. `"2Gi"`).
    pub memory: String,
    /// Ephemeral storage request (e.g. `"1Gi"`).
    pub ephemeral_storage: String,
}

impl Default for ResourceRequests {
    fn default() -> Self {
        Self {
            cpu: "2".to_string(),
            memory: "2Gi".to_string(),
            ephemeral_storage: "1Gi".to_string(),
        }
    }
}

impl ResourceRequests {
    /// Attribute overriding the CPU request.
    pub const CPUS_ATTRIBUTE: &'static str = "cpus";
    /// Attribute overriding the memory request.
    pub const MEMORY_ATTRIBUTE: &'static str = "memory";
    /// Attribute overriding the ephemeral storage request.
    pub const EPHEMERAL_STORAGE_ATTRIBUTE: &'static str = "ephemeral_storage";

    /// Returns these requests with any per-question overrides applied.
    ///
    /// Empty or `null` override values are ignored.
    #[must_use]
    pub fn with_overrides(&self, attributes: &Attributes) -> Self {
        let pick = |name: &str, default: &str| {
            attributes
                .get(name)
                .and_then(quantity_text)
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            cpu: pick(Self::CPUS_ATTRIBUTE, &self.cpu),
            memory: pick(Self::MEMORY_ATTRIBUTE, &self.memory),
            ephemeral_storage: pick(Self::EPHEMERAL_STORAGE_ATTRIBUTE, &self.ephemeral_storage),
        }
    }
}

fn quantity_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Deployment-wide settings applied to every question job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSettings {
    /// Kueue local queue the job is submitted to.
    pub queue_name: String,
    /// Topic the question container publishes its events to.
    pub services_topic: String,
    /// Image repository URL; the recipient SRUID is appended to form the image.
    pub registry_url: String,
    /// Resource requests used when a question does not override them.
    pub default_resources: ResourceRequests,
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A container environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// Everything needed to submit one question as a suspended batch job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionJob {
    /// Job (and container) name; see [`JobName::for_question`].
    pub name: JobName,
    /// The question this job answers.
    pub question_uuid: QuestionUuid,
    /// The service revision answering the question.
    pub recipient: Sruid,
    /// Job labels, including the Kueue queue label.
    pub labels: BTreeMap<String, String>,
    /// Fully qualified container image.
    pub image: String,
    /// Container entrypoint.
    pub command: Vec<String>,
    /// Container arguments.
    pub args: Vec<String>,
    /// Container environment.
    pub env: Vec<EnvVar>,
    /// Container resource requests.
    pub resources: ResourceRequests,
}

impl QuestionJob {
    /// Builds the job for a question event.
    ///
    /// `attributes` are the question's original, complete attributes; they are
    /// passed to the container verbatim as `--attributes`.
    ///
    /// # Errors
    ///
    /// Returns [`JobBuildError`] if `question_uuid` or `recipient` is missing,
    /// or the recipient is not a valid SRUID.
    pub fn build(
        event: &Event,
        attributes: &Attributes,
        settings: &JobSettings,
    ) -> Result<Self, JobBuildError> {
        let question_uuid = required_attribute(attributes, "question_uuid")
            .and_then(|value| QuestionUuid::new(value).ok_or_else(|| missing("question_uuid")))?;
        let recipient = Sruid::parse(&required_attribute(attributes, "recipient")?)?;
        let name = JobName::for_question(&question_uuid);

        let mut args = vec![
            "--attributes".to_string(),
            Value::Object(attributes.clone()).to_string(),
        ];

        if let Some(input_values) = event.field("input_values").filter(|v| is_truthy(v)) {
            args.push("--input-values".to_string());
            args.push(input_values.to_string());
        }

        if let Some(input_manifest) = event.field("input_manifest").filter(|v| is_truthy(v)) {
            args.push("--input-manifest".to_string());
            args.push(input_manifest.to_string());
        }

        let env = vec![
            EnvVar::new("OCTUE_SERVICES_TOPIC", settings.services_topic.clone()),
            EnvVar::new("COMPUTE_PROVIDER", COMPUTE_PROVIDER),
            EnvVar::new("OCTUE_SERVICE_REVISION_TAG", recipient.revision_tag().as_str()),
        ];

        let labels = BTreeMap::from([(QUEUE_NAME_LABEL.to_string(), settings.queue_name.clone())]);

        Ok(Self {
            image: format!("{}/{}", settings.registry_url.trim_end_matches('/'), recipient),
            command: QUESTION_COMMAND.iter().map(ToString::to_string).collect(),
            resources: settings.default_resources.with_overrides(attributes),
            name,
            question_uuid,
            recipient,
            labels,
            args,
            env,
        })
    }
}

fn missing(name: &str) -> JobBuildError {
    JobBuildError::MissingAttribute {
        name: name.to_string(),
    }
}

fn required_attribute(attributes: &Attributes, name: &str) -> Result<String, JobBuildError> {
    match attributes.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) | None => Err(missing(name)),
        Some(other) => Ok(other.to_string()),
    }
}

/// Whether an optional input counts as supplied: `null`, `false`, zero, and
/// empty strings, arrays and objects do not.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
