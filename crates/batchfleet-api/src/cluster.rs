//! GKE cluster records and provisioning parameters.

use serde::{Deserialize, Serialize};

/// A live cluster as reported by the cluster manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// `PROVISIONING`, `RUNNING`, `STOPPING`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_node_count: Option<u32>,
}

impl ClusterInfo {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: Some(location.into()),
            status: None,
            current_node_count: None,
        }
    }
}

/// Desired shape of one cluster in a fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub name: String,
    pub machine_type: String,
    pub node_count: u32,
    pub region: String,
    /// Dedicated subnetwork created alongside the cluster.
    pub subnetwork: String,
}

/// Cluster-wide settings shared by every cluster of a fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningProfile {
    pub cluster_version: String,
    pub disk_size_gb: u32,
    pub disk_type: String,
    pub image_type: String,
    pub local_ssd_count: u32,
    /// CIDR size of each cluster's subnetwork, e.g. `/21`.
    pub subnetwork_range: String,
    pub enable_cloud_logging: bool,
    pub enable_cloud_monitoring: bool,
    pub enable_autorepair: bool,
}

impl Default for ProvisioningProfile {
    fn default() -> Self {
        Self {
            cluster_version: "1.12.7-gke.10".to_string(),
            disk_size_gb: 90,
            disk_type: "pd-ssd".to_string(),
            image_type: "cos".to_string(),
            local_ssd_count: 1,
            subnetwork_range: "/21".to_string(),
            enable_cloud_logging: false,
            enable_cloud_monitoring: false,
            enable_autorepair: false,
        }
    }
}
