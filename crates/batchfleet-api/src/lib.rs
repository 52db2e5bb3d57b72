//! batchfleet control-plane wire types
//!
//! The subset of the Kubernetes `batch/v1` and `apps/v1` object model the
//! orchestrator creates and reads, plus the GKE cluster records returned by
//! the cluster manager. Field names follow the upstream JSON encoding so the
//! types round-trip through `kubectl` and `gcloud` unchanged.

pub mod cluster;
pub mod error;
pub mod job;
pub mod list;
pub mod pod;

pub use cluster::{ClusterInfo, ClusterSpec, ProvisioningProfile};
pub use error::{ControlPlaneError, ErrorCode};
pub use job::{DaemonSet, DaemonSetSpec, Job, JobCondition, JobSpec, JobStatus, LabelSelector};
pub use list::{JobList, ListMeta, ListParams};
pub use pod::{Container, EnvVar, ObjectMeta, PodSpec, PodTemplateSpec, ResourceRequirements};

/// `apiVersion` of Job objects.
pub const BATCH_API_VERSION: &str = "batch/v1";

/// `apiVersion` of DaemonSet objects.
pub const APPS_API_VERSION: &str = "apps/v1";
