//! Conversion of a [`QuestionJob`] into a `batch/v1` Job.

use std::collections::BTreeMap;

use events::QuestionJob;
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Pods of a question job are never restarted in place.
pub const RESTART_POLICY: &str = "Never";

/// Builds the suspended, single-pod Job for a question.
pub fn to_kubernetes_job(job: &QuestionJob) -> Job {
    let requests = BTreeMap::from([
        ("cpu".to_string(), Quantity(job.resources.cpu.clone())),
        ("memory".to_string(), Quantity(job.resources.memory.clone())),
        (
            "ephemeral-storage".to_string(),
            Quantity(job.resources.ephemeral_storage.clone()),
        ),
    ]);

    let env = job
        .env
        .iter()
        .map(|var| EnvVar {
            name: var.name.clone(),
            value: Some(var.value.clone()),
            value_from: None,
        })
        .collect();

    let container = Container {
        name: job.name.as_str().to_string(),
        image: Some(job.image.clone()),
        command: Some(job.command.clone()),
        args: Some(job.args.clone()),
        env: Some(env),
        resources: Some(ResourceRequirements {
            requests: Some(requests),
            ..Default::default()
        }),
        ..Default::default()
    };

    Job {
        metadata: ObjectMeta {
            name: Some(job.name.as_str().to_string()),
            labels: Some(job.labels.clone()),
            ..Default::default()
        },
        spec: Some(JobSpec {
            suspend: Some(true),
            parallelism: Some(1),
            completions: Some(1),
            template: PodTemplateSpec {
                metadata: None,
                spec: Some(PodSpec {
                    containers: vec![container],
                    restart_policy: Some(RESTART_POLICY.to_string()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
