//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through the environment variable
//! named next to it; deployments use the environment.

use std::time::Duration;

use anyhow::{bail, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use events::{JobSettings, LegacyTopicAction, ResourceRequests, SweepPolicy};

/// Serves one Twined cloud function over HTTP.
#[derive(Debug, Parser)]
#[command(name = "twined-functions", version, about, long_about = None)]
pub struct Cli {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080, global = true)]
    pub port: u16,

    /// Log output format.
    #[arg(long, env = "TWINED_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,

    /// OTLP gRPC endpoint for span export. Export is disabled when unset.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT", global = true)]
    pub otlp_endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// The function to serve.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Store service events in BigQuery and dispatch questions to Kueue.
    EventHandler(EventHandlerArgs),
    /// Run scheduled maintenance (answer-topic sweep).
    Helper(HelperArgs),
    /// Look up service revisions in Artifact Registry.
    ServiceRegistry(ServiceRegistryArgs),
}

impl Commands {
    /// Name of the function, as used in logs and the OTel service name.
    pub fn function_name(&self) -> &'static str {
        match self {
            Self::EventHandler(_) => "event-handler",
            Self::Helper(_) => "helper",
            Self::ServiceRegistry(_) => "service-registry",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// JSON lines, for Cloud Logging.
    Json,
    /// Human-readable, for local development.
    Pretty,
}

#[derive(Debug, clap::Args)]
pub struct EventHandlerArgs {
    /// Project of the events table when it is given as `dataset.table`.
    #[arg(long, env = "GCP_PROJECT_ID")]
    pub project_id: Option<String>,

    /// Events table, `project.dataset.table` or `dataset.table`.
    #[arg(long, env = "BIGQUERY_EVENTS_TABLE")]
    pub events_table: String,

    /// Dispatch questions and cancellations to Kueue.
    #[arg(long, env = "USE_KUEUE", default_value = "1", action = ArgAction::Set, value_parser = parse_flag)]
    pub use_kueue: bool,

    /// Topic question containers publish their events to.
    #[arg(long, env = "OCTUE_SERVICES_TOPIC")]
    pub services_topic: Option<String>,

    /// Kueue local queue question jobs are submitted to.
    #[arg(long, env = "KUEUE_LOCAL_QUEUE")]
    pub queue_name: Option<String>,

    /// Image repository URL; the recipient SRUID is appended to it.
    #[arg(long, env = "ARTIFACT_REGISTRY_REPOSITORY_URL")]
    pub registry_url: Option<String>,

    /// Namespace question jobs are created in.
    #[arg(long, env = "KUBERNETES_NAMESPACE", default_value = "default")]
    pub namespace: String,

    /// Kubeconfig context of the cluster. Inferred when unset.
    #[arg(long, env = "KUBERNETES_CONTEXT")]
    pub kube_context: Option<String>,

    /// CPU request for questions that do not set `cpus`.
    #[arg(long, env = "DEFAULT_CPUS", default_value = "2")]
    pub default_cpus: String,

    /// Memory request for questions that do not set `memory`.
    #[arg(long, env = "DEFAULT_MEMORY", default_value = "2Gi")]
    pub default_memory: String,

    /// Ephemeral storage request for questions that do not set `ephemeral_storage`.
    #[arg(long, env = "DEFAULT_EPHEMERAL_STORAGE", default_value = "1Gi")]
    pub default_ephemeral_storage: String,
}

impl EventHandlerArgs {
    /// Returns the job settings, or `None` when Kueue dispatch is disabled.
    ///
    /// # Errors
    ///
    /// Fails if dispatch is enabled but a setting it needs is missing.
    pub fn job_settings(&self) -> Result<Option<JobSettings>> {
        if !self.use_kueue {
            return Ok(None);
        }

        Ok(Some(JobSettings {
            queue_name: required(&self.queue_name, "KUEUE_LOCAL_QUEUE")?,
            services_topic: required(&self.services_topic, "OCTUE_SERVICES_TOPIC")?,
            registry_url: required(&self.registry_url, "ARTIFACT_REGISTRY_REPOSITORY_URL")?,
            default_resources: ResourceRequests {
                cpu: self.default_cpus.clone(),
                memory: self.default_memory.clone(),
                ephemeral_storage: self.default_ephemeral_storage.clone(),
            },
        }))
    }
}

#[derive(Debug, clap::Args)]
pub struct HelperArgs {
    /// Project whose topics are swept.
    #[arg(long, env = "GCP_PROJECT_ID")]
    pub project_id: String,

    /// Age in seconds after which an answer topic is deleted.
    #[arg(long, env = "SECONDS_TO_KEEP", default_value_t = 604_800.0, value_parser = parse_seconds)]
    pub seconds_to_keep: f64,

    /// What to do with answer topics that have no `created` label.
    #[arg(long, env = "LEGACY_TOPIC_ACTION", default_value = "keep")]
    pub legacy_topic_action: LegacyTopicAction,
}

impl HelperArgs {
    pub fn sweep_policy(&self) -> SweepPolicy {
        SweepPolicy {
            retention: Duration::from_secs_f64(self.seconds_to_keep),
            legacy_action: self.legacy_topic_action,
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct ServiceRegistryArgs {
    /// Repository resource name,
    /// `projects/{project}/locations/{location}/repositories/{id}`.
    #[arg(long, env = "ARTIFACT_REGISTRY_REPOSITORY_ID")]
    pub repository_id: String,
}

fn required(value: &Option<String>, variable: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => bail!("{variable} must be set when USE_KUEUE is enabled"),
    }
}

fn parse_flag(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(format!("'{other}' is not a boolean (expected 1/0/true/false)")),
    }
}

fn parse_seconds(value: &str) -> Result<f64, String> {
    let seconds: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number of seconds"))?;
    if (0.0..u64::MAX as f64).contains(&seconds) {
        Ok(seconds)
    } else {
        Err(format!("'{value}' is not a usable number of seconds"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("twined-functions").chain(args.iter().copied())).unwrap()
    }

    fn event_handler(args: &[&str]) -> EventHandlerArgs {
        let mut all = vec!["event-handler", "--events-table", "my-project.dataset.events"];
        all.extend_from_slice(args);
        match parse(&all).command {
            Commands::EventHandler(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn kueue_disabled_needs_no_job_settings() {
        let args = event_handler(&["--use-kueue", "0"]);

        assert!(!args.use_kueue);
        assert_eq!(args.job_settings().unwrap(), None);
    }

    #[test]
    fn kueue_enabled_requires_queue_settings() {
        let args = event_handler(&["--use-kueue", "true", "--services-topic", "octue.services"]);

        let error = args.job_settings().unwrap_err();

        assert!(error.to_string().contains("KUEUE_LOCAL_QUEUE"), "{error}");
    }

    #[test]
    fn job_settings_from_flags() {
        let args = event_handler(&[
            "--use-kueue",
            "1",
            "--services-topic",
            "octue.services",
            "--queue-name",
            "investigations",
            "--registry-url",
            "europe-west9-docker.pkg.dev/p/r",
            "--default-memory",
            "4Gi",
        ]);

        let settings = args.job_settings().unwrap().unwrap();

        assert_eq!(settings.queue_name, "investigations");
        assert_eq!(settings.default_resources.memory, "4Gi");
        assert_eq!(settings.default_resources.cpu, "2");
    }

    #[test]
    fn invalid_flag_value_is_rejected() {
        let result = Cli::try_parse_from([
            "twined-functions",
            "event-handler",
            "--events-table",
            "d.t",
            "--use-kueue",
            "maybe",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn helper_policy() {
        let cli = parse(&[
            "helper",
            "--project-id",
            "my-project",
            "--seconds-to-keep",
            "60",
            "--legacy-topic-action",
            "delete",
        ]);

        let Commands::Helper(args) = cli.command else {
            panic!("expected helper");
        };
        let policy = args.sweep_policy();

        assert_eq!(policy.retention, Duration::from_secs(60));
        assert_eq!(policy.legacy_action, LegacyTopicAction::Delete);
    }

    #[test]
    fn fractional_retention_is_accepted() {
        let cli = parse(&["helper", "--project-id", "my-project", "--seconds-to-keep", "3600.5"]);

        let Commands::Helper(args) = cli.command else {
            panic!("expected helper");
        };

        assert_eq!(args.sweep_policy().retention, Duration::from_millis(3_600_500));
    }

    #[test]
    fn negative_or_non_numeric_retention_is_rejected() {
        for value in ["-1", "forever", "NaN", "inf"] {
            let result = Cli::try_parse_from([
                "twined-functions",
                "helper",
                "--project-id",
                "my-project",
                "--seconds-to-keep",
                value,
            ]);

            assert!(result.is_err(), "{value}");
        }
    }

    #[test]
    fn global_options_follow_the_subcommand() {
        let cli = parse(&[
            "service-registry",
            "--repository-id",
            "projects/p/locations/l/repositories/r",
            "--port",
            "9000",
            "--log-format",
            "json",
        ]);

        assert_eq!(cli.port, 9000);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.command.function_name(), "service-registry");
    }
}
