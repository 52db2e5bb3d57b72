//! Partitioning properties
//!
//! Determinism, ordering and filtering of the dataset partitioner, driven
//! both directly and through the facade.

mod fixtures;

use std::sync::Arc;

use batchfleet::mock::{ControlPlaneOp, FakeControlPlane};
use batchfleet::partition::{job_name, partition, PartitionError, UnitTemplate};
use batchfleet::{Configuration, ExitCode};
use batchfleet_manifest::{DatasetManifest, DatasetPattern, DatasetSource};
use fixtures::{facade, submit_overrides, three_dataset_manifest, ManifestFile};
use serde_json::json;

fn manifest() -> DatasetManifest {
    DatasetManifest::parse(&three_dataset_manifest().to_string()).unwrap()
}

fn template(run: &str) -> Arc<UnitTemplate> {
    let config = Configuration::from_overrides(json!({"run": run})).unwrap();
    Arc::new(UnitTemplate::from_config(&config))
}

// =============================================================================
// Explicit index
// =============================================================================

#[test]
fn test_explicit_index_yields_one_named_unit() {
    let units = partition(&manifest(), &template("higgs"), None, Some(1)).unwrap();

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].job_name, job_name("higgs", 1));
    assert_eq!(units[0].job_name, "higgs-1");
    assert_eq!(units[0].dataset.name, "DoubleElectron_2012C");
}

#[test]
fn test_explicit_index_is_deterministic() {
    let template = template("higgs");
    let first = partition(&manifest(), &template, None, Some(2)).unwrap();
    let second = partition(&manifest(), &template, None, Some(2)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_out_of_range_index() {
    let err = partition(&manifest(), &template("higgs"), None, Some(3)).unwrap_err();
    assert_eq!(err, PartitionError::InvalidSelection { index: 3, len: 3 });
}

#[test]
fn test_index_wins_over_pattern() {
    let pattern = DatasetPattern::new("*DoubleMu*").unwrap();
    let units = partition(&manifest(), &template("higgs"), Some(&pattern), Some(1)).unwrap();

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].index, 1);
}

// =============================================================================
// Full manifest and pattern filters
// =============================================================================

#[test]
fn test_full_manifest_in_order() {
    let units = partition(&manifest(), &template("run6"), None, None).unwrap();

    let names: Vec<&str> = units.iter().map(|u| u.job_name.as_str()).collect();
    assert_eq!(names, vec!["run6-0", "run6-1", "run6-2"]);
}

#[test]
fn test_pattern_is_ordered_subsequence() {
    let pattern = DatasetPattern::new("DoubleMu*").unwrap();
    let units = partition(&manifest(), &template("run6"), Some(&pattern), None).unwrap();

    let indices: Vec<usize> = units.iter().map(|u| u.index).collect();
    assert_eq!(indices, vec![0, 2]);
    assert_eq!(units[1].job_name, "run6-2");
}

#[test]
fn test_pattern_matching_nothing() {
    let pattern = DatasetPattern::new("SingleMuon*").unwrap();
    let units = partition(&manifest(), &template("run6"), Some(&pattern), None).unwrap();
    assert!(units.is_empty());
}

#[test]
fn test_sources_follow_entries() {
    let units = partition(&manifest(), &template("run6"), None, None).unwrap();

    assert!(matches!(units[0].dataset.source, DatasetSource::Files(ref files) if files.len() == 1));
    assert_eq!(
        units[1].dataset.source,
        DatasetSource::Pattern("*DoubleElectron*2012C*".to_string())
    );
    assert_eq!(
        units[2].dataset.source,
        DatasetSource::Pattern("DoubleMuParked_2012C".to_string())
    );
}

#[test]
fn test_units_share_template() {
    let units = partition(&manifest(), &template("run6"), None, None).unwrap();
    assert!(Arc::ptr_eq(&units[0].template, &units[2].template));
}

// =============================================================================
// Through the facade
// =============================================================================

#[test]
fn test_facade_plan_with_pattern_filter() {
    let file = ManifestFile::write(&three_dataset_manifest());
    let fake = Arc::new(FakeControlPlane::new());
    let mut overrides = submit_overrides(&file, "higgs");
    overrides["dataset"]["pattern"] = json!("*2012C");

    let units = facade(&fake, overrides).plan().unwrap();

    let names: Vec<&str> = units.iter().map(|u| u.job_name.as_str()).collect();
    assert_eq!(names, vec!["higgs-1", "higgs-2"]);
    assert_eq!(fake.calls(ControlPlaneOp::CreateJob), 0);
}

#[test]
fn test_facade_out_of_range_index_submits_nothing() {
    let file = ManifestFile::write(&three_dataset_manifest());
    let fake = Arc::new(FakeControlPlane::new());
    let mut overrides = submit_overrides(&file, "higgs");
    overrides["dataset"]["index"] = json!(7);

    let err = facade(&fake, overrides).submit().unwrap_err();

    assert_eq!(err.exit_code(), ExitCode::InvalidSelection);
    assert_eq!(fake.calls(ControlPlaneOp::CreateJob), 0);
}

#[test]
fn test_facade_invalid_pattern_is_configuration_error() {
    let file = ManifestFile::write(&three_dataset_manifest());
    let fake = Arc::new(FakeControlPlane::new());
    let mut overrides = submit_overrides(&file, "higgs");
    overrides["dataset"]["pattern"] = json!("[unclosed");

    let err = facade(&fake, overrides).submit().unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::Configuration);
}
