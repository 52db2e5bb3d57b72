//! Cluster fleet lifecycle
//!
//! Collision-safe creation and best-effort deletion of a three-cluster fleet
//! against the in-memory control plane.

mod fixtures;

use std::sync::Arc;

use batchfleet::deploy::{load_manifest, DeployError};
use batchfleet::fleet::{cluster_name, ClusterFleetManager, FleetError, FleetTarget};
use batchfleet::mock::{ControlPlaneOp, FakeControlPlane};
use batchfleet::ExitCode;
use batchfleet_api::{ClusterInfo, ControlPlaneError};
use batchfleet_manifest::DatasetManifest;
use fixtures::{three_dataset_manifest, ManifestFile};
use serde_json::json;

const PREFIX: &str = "kubecon-demo-";
const REGION: &str = "europe-west4";

fn target() -> FleetTarget {
    FleetTarget {
        project: "nimble-valve-236407".to_string(),
        region: REGION.to_string(),
        prefix: PREFIX.to_string(),
    }
}

fn manifest() -> DatasetManifest {
    let file = ManifestFile::write(&three_dataset_manifest());
    load_manifest(&file.path).unwrap()
}

#[test]
fn test_create_fleet_requests_every_cluster() {
    let fake = Arc::new(FakeControlPlane::new());
    let report = ClusterFleetManager::new(fake.clone())
        .create_fleet(&manifest(), &target())
        .unwrap();

    assert_eq!(report.len(), 3);
    assert!(report.is_clean());
    let second = fake.cluster(&cluster_name(PREFIX, 1)).unwrap();
    assert_eq!(second.current_node_count, Some(5));
    assert_eq!(second.status.as_deref(), Some("PROVISIONING"));
}

#[test]
fn test_live_name_blocks_entire_fleet() {
    let fake = Arc::new(FakeControlPlane::new());
    fake.add_cluster(ClusterInfo::new(cluster_name(PREFIX, 2), REGION));

    let err = ClusterFleetManager::new(fake.clone())
        .create_fleet(&manifest(), &target())
        .unwrap_err();

    assert!(matches!(err, FleetError::Collision { ref names } if names == &["kubecon-demo-2"]));
    assert_eq!(fake.calls(ControlPlaneOp::CreateCluster), 0);
    assert_eq!(DeployError::from(err).exit_code(), ExitCode::FleetCollision);
}

#[test]
fn test_same_name_in_other_region_is_not_a_collision() {
    let fake = Arc::new(FakeControlPlane::new());
    fake.add_cluster(ClusterInfo::new("kubecon-demo-0-us", "us-central1"));

    let report = ClusterFleetManager::new(fake.clone())
        .create_fleet(&manifest(), &target())
        .unwrap();
    assert!(report.is_clean());
}

#[test]
fn test_manifest_without_sizing_sends_nothing() {
    let fake = Arc::new(FakeControlPlane::new());
    let file = ManifestFile::write(&json!([{"dataset": "a", "flavor": "n1-standard-8"}]));
    let manifest = load_manifest(&file.path).unwrap();

    let err = ClusterFleetManager::new(fake.clone())
        .create_fleet(&manifest, &target())
        .unwrap_err();

    assert!(matches!(err, FleetError::Manifest(_)));
    assert_eq!(fake.calls(ControlPlaneOp::ListClusters), 0);
    assert_eq!(DeployError::from(err).exit_code(), ExitCode::Configuration);
}

#[test]
fn test_delete_fleet_issues_every_delete() {
    let fake = Arc::new(FakeControlPlane::new());
    let manager = ClusterFleetManager::new(fake.clone());
    manager.create_fleet(&manifest(), &target()).unwrap();
    fake.fail_on(
        ControlPlaneOp::DeleteCluster,
        Some("kubecon-demo-1"),
        ControlPlaneError::unavailable("operation timed out"),
    );

    let report = manager.delete_fleet(&manifest(), &target());

    assert_eq!(fake.calls(ControlPlaneOp::DeleteCluster), 3);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures().next().unwrap().name, "kubecon-demo-1");
    assert_eq!(report.exit_code(), ExitCode::PartialFailure);
}

#[test]
fn test_delete_missing_clusters_reports_each() {
    let fake = Arc::new(FakeControlPlane::new());

    let report = ClusterFleetManager::new(fake.clone()).delete_fleet(&manifest(), &target());

    assert_eq!(report.len(), 3);
    assert_eq!(report.failed(), 3);
    assert!(report
        .failures()
        .all(|r| r.error.as_ref().unwrap().is_not_found()));
}

#[test]
fn test_recreate_after_delete() {
    let fake = Arc::new(FakeControlPlane::new());
    let manager = ClusterFleetManager::new(fake.clone());

    manager.create_fleet(&manifest(), &target()).unwrap();
    assert!(manager.delete_fleet(&manifest(), &target()).is_clean());
    let again = manager.create_fleet(&manifest(), &target()).unwrap();

    assert!(again.is_clean());
    assert_eq!(fake.cluster_names().len(), 3);
}
