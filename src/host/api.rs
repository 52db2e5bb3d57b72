//! Control-plane seams
//!
//! Everything the orchestrator asks of Kubernetes and of the cluster manager
//! goes through these two traits. Production adapters shell out to `kubectl`
//! and `gcloud`; tests use the in-memory fake from [`crate::mock`].

use batchfleet_api::{
    ClusterInfo, ClusterSpec, ControlPlaneError, DaemonSet, Job, JobList, ListParams,
    ProvisioningProfile,
};

/// Namespaced workload operations.
pub trait JobApi: Send + Sync {
    fn create_job(&self, namespace: &str, job: &Job) -> Result<(), ControlPlaneError>;

    /// One page of Jobs.
    fn list_jobs(&self, namespace: &str, params: &ListParams)
        -> Result<JobList, ControlPlaneError>;

    /// Delete a Job and, in the background, its pods.
    fn delete_job(&self, namespace: &str, name: &str) -> Result<(), ControlPlaneError>;

    /// Create the DaemonSet or replace an existing one of the same name.
    fn apply_daemon_set(&self, namespace: &str, daemon_set: &DaemonSet)
        -> Result<(), ControlPlaneError>;

    /// Delete a DaemonSet; deleting one that does not exist succeeds.
    fn delete_daemon_set(&self, namespace: &str, name: &str) -> Result<(), ControlPlaneError>;
}

/// Cluster provisioning operations.
pub trait ClusterApi: Send + Sync {
    fn list_clusters(&self, project: &str, region: &str)
        -> Result<Vec<ClusterInfo>, ControlPlaneError>;

    /// Request a cluster. Returns once the request is accepted, not once the
    /// cluster is running.
    fn create_cluster(
        &self,
        project: &str,
        spec: &ClusterSpec,
        profile: &ProvisioningProfile,
    ) -> Result<(), ControlPlaneError>;

    fn delete_cluster(&self, project: &str, region: &str, name: &str)
        -> Result<(), ControlPlaneError>;
}
