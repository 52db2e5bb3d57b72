//! Shared fixtures for the integration tests
//!
//! - Manifest files written to a temp dir
//! - A facade wired to an in-memory control plane

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use batchfleet::mock::FakeControlPlane;
use batchfleet::{Configuration, DeploymentFacade};
use serde_json::{json, Value};
use tempfile::TempDir;

/// The three-entry manifest used across the fleet and partition tests.
pub fn three_dataset_manifest() -> Value {
    json!([
        {
            "dataset": "DoubleMuParked_2012B",
            "files": ["root://eospublic.cern.ch//eos/opendata/cms/a.root"],
            "flavor": "n1-standard-8",
            "nodes": 3
        },
        {
            "dataset": "DoubleElectron_2012C",
            "pattern": "*DoubleElectron*2012C*",
            "flavor": "n1-highcpu-16",
            "nodes": 5
        },
        {
            "dataset": "DoubleMuParked_2012C",
            "flavor": "n1-standard-4",
            "nodes": 1
        }
    ])
}

/// A manifest file that lives as long as the returned dir.
pub struct ManifestFile {
    _dir: TempDir,
    pub path: PathBuf,
}

impl ManifestFile {
    pub fn write(manifest: &Value) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("mapping.json");
        std::fs::write(&path, serde_json::to_string_pretty(manifest).expect("encode manifest"))
            .expect("write manifest");
        Self { _dir: dir, path }
    }
}

/// A facade over `fake` with the given CLI-style overrides.
pub fn facade(fake: &Arc<FakeControlPlane>, overrides: Value) -> DeploymentFacade {
    let config = Configuration::from_overrides(overrides).expect("valid configuration");
    DeploymentFacade::new(config, fake.clone())
}

/// Overrides selecting every entry of `manifest` for `run`.
pub fn submit_overrides(manifest: &ManifestFile, run: &str) -> Value {
    json!({
        "run": run,
        "dataset": {"mapping": manifest.path}
    })
}
