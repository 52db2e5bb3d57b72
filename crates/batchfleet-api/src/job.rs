//! `batch/v1` Job and `apps/v1` DaemonSet objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::pod::{ObjectMeta, PodTemplateSpec};
use crate::{APPS_API_VERSION, BATCH_API_VERSION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(default = "default_batch_api_version")]
    pub api_version: String,

    #[serde(default = "default_job_kind")]
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<JobSpec>,

    /// Written by the job controller; absent on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
}

fn default_batch_api_version() -> String {
    BATCH_API_VERSION.to_string()
}

fn default_job_kind() -> String {
    "Job".to_string()
}

impl Job {
    pub fn new(metadata: ObjectMeta, spec: JobSpec) -> Self {
        Self {
            api_version: default_batch_api_version(),
            kind: default_job_kind(),
            metadata,
            spec: Some(spec),
            status: None,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata.name_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    /// Pod retries before the job is marked failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_limit: Option<u32>,

    pub template: PodTemplateSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    /// Pods currently running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub succeeded: Option<u32>,

    /// Pods that terminated in failure, i.e. retries consumed so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<JobCondition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,
}

impl JobStatus {
    /// Whether a condition of `kind` is present with status `"True"`.
    pub fn has_condition(&self, kind: &str) -> bool {
        self.conditions
            .iter()
            .any(|c| c.type_ == kind && c.status == "True")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCondition {
    #[serde(rename = "type")]
    pub type_: String,

    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl JobCondition {
    pub fn active(kind: &str, reason: Option<&str>) -> Self {
        Self {
            type_: kind.to_string(),
            status: "True".to_string(),
            reason: reason.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonSet {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: DaemonSetSpec,
}

impl DaemonSet {
    pub fn new(metadata: ObjectMeta, spec: DaemonSetSpec) -> Self {
        Self {
            api_version: APPS_API_VERSION.to_string(),
            kind: "DaemonSet".to_string(),
            metadata,
            spec,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata.name_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonSetSpec {
    pub selector: LabelSelector,
    pub template: PodTemplateSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    pub match_labels: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_server_job() {
        let job: Job = serde_json::from_value(json!({
            "apiVersion": "batch/v1",
            "kind": "Job",
            "metadata": {
                "name": "run6-3",
                "namespace": "default",
                "creationTimestamp": "2019-05-20T10:15:00Z",
                "labels": {"app.kubernetes.io/managed-by": "batchfleet"},
                "uid": "0d5c6a4e-7b0e-11e9-8f9e-2a86e4085a59"
            },
            "spec": {
                "backoffLimit": 5,
                "template": {"spec": {"containers": [{"name": "worker", "image": "img"}]}}
            },
            "status": {
                "failed": 2,
                "conditions": [
                    {"type": "Failed", "status": "True", "reason": "BackoffLimitExceeded"}
                ]
            }
        }))
        .unwrap();

        assert_eq!(job.name(), "run6-3");
        assert!(job.metadata.creation_timestamp.is_some());
        let status = job.status.unwrap();
        assert_eq!(status.failed, Some(2));
        assert!(status.has_condition("Failed"));
        assert!(!status.has_condition("Complete"));
    }

    #[test]
    fn test_new_job_omits_status() {
        let job = Job::new(ObjectMeta::named("run6-0", "default"), JobSpec::default());
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["apiVersion"], "batch/v1");
        assert_eq!(value["kind"], "Job");
        assert!(value.get("status").is_none());
        assert!(value["metadata"].get("creationTimestamp").is_none());
    }

    #[test]
    fn test_false_condition_ignored() {
        let status = JobStatus {
            conditions: vec![JobCondition {
                type_: "Complete".to_string(),
                status: "False".to_string(),
                reason: None,
            }],
            ..Default::default()
        };
        assert!(!status.has_condition("Complete"));
    }
}
