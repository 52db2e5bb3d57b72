//! `ClusterApi` over `gcloud container clusters`

use std::sync::Arc;

use batchfleet_api::{ClusterInfo, ClusterSpec, ControlPlaneError, ProvisioningProfile};
use tracing::debug;

use super::api::ClusterApi;
use super::runner::CommandRunner;

const GCLOUD: &str = "gcloud";

pub struct GcloudClusterApi {
    runner: Arc<dyn CommandRunner>,
}

impl GcloudClusterApi {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn run(&self, args: Vec<String>) -> Result<String, ControlPlaneError> {
        debug!(?args, "Running gcloud");
        let output = self
            .runner
            .run(GCLOUD, &args, None)
            .map_err(|e| ControlPlaneError::unavailable(format!("failed to run gcloud: {}", e)))?;

        if !output.success {
            return Err(ControlPlaneError::from_stderr(&output.stderr));
        }
        Ok(output.stdout)
    }
}

fn toggle(enabled: bool, flag: &str) -> String {
    if enabled {
        format!("--enable-{}", flag)
    } else {
        format!("--no-enable-{}", flag)
    }
}

/// Arguments of the asynchronous create request for one cluster.
pub fn create_args(project: &str, spec: &ClusterSpec, profile: &ProvisioningProfile) -> Vec<String> {
    vec![
        "container".to_string(),
        "clusters".to_string(),
        "create".to_string(),
        spec.name.clone(),
        "--project".to_string(),
        project.to_string(),
        "--region".to_string(),
        spec.region.clone(),
        "--quiet".to_string(),
        "--async".to_string(),
        "--machine-type".to_string(),
        spec.machine_type.clone(),
        "--num-nodes".to_string(),
        spec.node_count.to_string(),
        "--cluster-version".to_string(),
        profile.cluster_version.clone(),
        "--disk-size".to_string(),
        profile.disk_size_gb.to_string(),
        "--disk-type".to_string(),
        profile.disk_type.clone(),
        "--image-type".to_string(),
        profile.image_type.clone(),
        "--local-ssd-count".to_string(),
        profile.local_ssd_count.to_string(),
        "--enable-ip-alias".to_string(),
        "--create-subnetwork".to_string(),
        format!("name={},range={}", spec.subnetwork, profile.subnetwork_range),
        "--no-enable-basic-auth".to_string(),
        "--no-issue-client-certificate".to_string(),
        "--metadata".to_string(),
        "disable-legacy-endpoints=true".to_string(),
        toggle(profile.enable_cloud_logging, "cloud-logging"),
        toggle(profile.enable_cloud_monitoring, "cloud-monitoring"),
        toggle(profile.enable_autorepair, "autorepair"),
    ]
}

impl ClusterApi for GcloudClusterApi {
    fn list_clusters(
        &self,
        project: &str,
        region: &str,
    ) -> Result<Vec<ClusterInfo>, ControlPlaneError> {
        let stdout = self.run(vec![
            "container".to_string(),
            "clusters".to_string(),
            "list".to_string(),
            "--project".to_string(),
            project.to_string(),
            "--region".to_string(),
            region.to_string(),
            "--format".to_string(),
            "json".to_string(),
        ])?;

        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&stdout)
            .map_err(|e| ControlPlaneError::internal(format!("unreadable cluster list: {}", e)))
    }

    fn create_cluster(
        &self,
        project: &str,
        spec: &ClusterSpec,
        profile: &ProvisioningProfile,
    ) -> Result<(), ControlPlaneError> {
        self.run(create_args(project, spec, profile))?;
        Ok(())
    }

    fn delete_cluster(
        &self,
        project: &str,
        region: &str,
        name: &str,
    ) -> Result<(), ControlPlaneError> {
        self.run(vec![
            "container".to_string(),
            "clusters".to_string(),
            "delete".to_string(),
            name.to_string(),
            "--project".to_string(),
            project.to_string(),
            "--region".to_string(),
            region.to_string(),
            "--quiet".to_string(),
        ])?;
        Ok(())
    }
}
