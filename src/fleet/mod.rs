//! Cluster fleet lifecycle
//!
//! One cluster per manifest entry, named `prefix + index`. Creation is
//! all-or-nothing with respect to name collisions: the live cluster list is
//! read once and every derived name checked before the first create request.
//! Deletion is best-effort and visits every derived name.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use batchfleet_api::{ClusterSpec, ControlPlaneError, ProvisioningProfile};
use batchfleet_manifest::{DatasetManifest, ManifestError};
use thiserror::Error;
use tracing::{info, warn};

use crate::host::ClusterApi;
use crate::summary::{BatchReport, FleetReport};

/// Where a fleet lives and how its clusters are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetTarget {
    pub project: String,
    pub region: String,
    pub prefix: String,
}

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("Cluster name(s) already in use: {}", .names.join(", "))]
    Collision { names: Vec<String> },

    #[error("Failed to list clusters in {project}/{region}: {source}")]
    List {
        project: String,
        region: String,
        #[source]
        source: ControlPlaneError,
    },

    #[error("Manifest cannot describe a fleet: {0}")]
    Manifest(#[from] ManifestError),
}

/// Name of the cluster serving manifest entry `index`.
pub fn cluster_name(prefix: &str, index: usize) -> String {
    format!("{}{}", prefix, index)
}

/// Cluster specs for every manifest entry, in manifest order.
pub fn derive_specs(
    manifest: &DatasetManifest,
    target: &FleetTarget,
) -> Result<Vec<ClusterSpec>, FleetError> {
    manifest
        .iter()
        .map(|(index, entry)| -> Result<ClusterSpec, FleetError> {
            let (flavor, nodes) = entry.sizing(index)?;
            let name = cluster_name(&target.prefix, index);
            Ok(ClusterSpec {
                subnetwork: name.clone(),
                name,
                machine_type: flavor.to_string(),
                node_count: nodes,
                region: target.region.clone(),
            })
        })
        .collect()
}

pub struct ClusterFleetManager {
    api: Arc<dyn ClusterApi>,
    profile: ProvisioningProfile,
}

impl ClusterFleetManager {
    pub fn new(api: Arc<dyn ClusterApi>) -> Self {
        Self::with_profile(api, ProvisioningProfile::default())
    }

    pub fn with_profile(api: Arc<dyn ClusterApi>, profile: ProvisioningProfile) -> Self {
        Self { api, profile }
    }

    /// Request one cluster per manifest entry.
    ///
    /// Fails with [`FleetError::Collision`] before any request is sent if a
    /// derived name is live in the region or repeats within the fleet.
    /// Requests rejected after that are recorded per cluster. Returns once
    /// every request was sent, without waiting for provisioning.
    pub fn create_fleet(
        &self,
        manifest: &DatasetManifest,
        target: &FleetTarget,
    ) -> Result<FleetReport, FleetError> {
        let specs = derive_specs(manifest, target)?;

        let live: HashSet<String> = self
            .api
            .list_clusters(&target.project, &target.region)
            .map_err(|source| FleetError::List {
                project: target.project.clone(),
                region: target.region.clone(),
                source,
            })?
            .into_iter()
            .map(|cluster| cluster.name)
            .collect();

        let mut seen = HashSet::new();
        let collisions: BTreeSet<String> = specs
            .iter()
            .filter(|spec| live.contains(&spec.name) || !seen.insert(spec.name.as_str()))
            .map(|spec| spec.name.clone())
            .collect();
        if !collisions.is_empty() {
            return Err(FleetError::Collision {
                names: collisions.into_iter().collect(),
            });
        }

        let mut report = BatchReport::new("create clusters");
        for spec in &specs {
            let result = self.api.create_cluster(&target.project, spec, &self.profile);
            match result {
                Ok(()) => info!(
                    cluster = %spec.name,
                    machine_type = %spec.machine_type,
                    nodes = spec.node_count,
                    "Requested cluster"
                ),
                Err(ref e) => warn!(cluster = %spec.name, error = %e, "Cluster request rejected"),
            }
            report.record(&spec.name, result);
        }
        Ok(report)
    }

    /// Delete every derived cluster name, carrying on past failures.
    pub fn delete_fleet(&self, manifest: &DatasetManifest, target: &FleetTarget) -> FleetReport {
        let mut report = BatchReport::new("delete clusters");

        for (index, _) in manifest.iter() {
            let name = cluster_name(&target.prefix, index);
            let result = self
                .api
                .delete_cluster(&target.project, &target.region, &name);
            match result {
                Ok(()) => info!(cluster = %name, "Deleted cluster"),
                Err(ref e) => warn!(cluster = %name, error = %e, "Cluster deletion failed"),
            }
            report.record(name, result);
        }
        report
    }
}
