//! Job lifecycle tests
//!
//! Submission, paginated status and cleanup through the facade against the
//! in-memory control plane.

mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use batchfleet::jobs::{CompletionState, JobLifecycleController, MANAGED_BY_LABEL, RUN_LABEL};
use batchfleet::mock::{ControlPlaneOp, FailureConfig, FakeControlPlane};
use batchfleet::{ExitCode, StatusWatcher};
use batchfleet_api::ControlPlaneError;
use fixtures::{facade, submit_overrides, three_dataset_manifest, ManifestFile};
use serde_json::json;

// =============================================================================
// Submission
// =============================================================================

#[test]
fn test_submit_labels_every_job() {
    let file = ManifestFile::write(&three_dataset_manifest());
    let fake = Arc::new(FakeControlPlane::new());

    let report = facade(&fake, submit_overrides(&file, "higgs")).submit().unwrap();

    assert!(report.is_clean());
    for name in fake.job_names("default") {
        let job = fake.job("default", &name).unwrap();
        assert_eq!(job.metadata.labels[MANAGED_BY_LABEL], "batchfleet");
        assert_eq!(job.metadata.labels[RUN_LABEL], "higgs");
    }
}

#[test]
fn test_resubmit_reports_already_exists() {
    let file = ManifestFile::write(&three_dataset_manifest());
    let fake = Arc::new(FakeControlPlane::new());
    let facade = facade(&fake, submit_overrides(&file, "higgs"));

    facade.submit().unwrap();
    let second = facade.submit().unwrap();

    assert_eq!(second.failed(), 3);
    assert_eq!(second.exit_code(), ExitCode::PartialFailure);
    assert!(second
        .failures()
        .all(|r| r.error.as_ref().unwrap().is_already_exists()));
    assert_eq!(fake.job_count("default"), 3);
}

#[test]
fn test_submit_into_namespace() {
    let file = ManifestFile::write(&three_dataset_manifest());
    let fake = Arc::new(FakeControlPlane::new());
    let mut overrides = submit_overrides(&file, "higgs");
    overrides["namespace"] = json!("physics");

    facade(&fake, overrides).submit().unwrap();

    assert_eq!(fake.job_count("physics"), 3);
    assert_eq!(fake.job_count("default"), 0);
}

// =============================================================================
// Status
// =============================================================================

#[test]
fn test_status_over_three_pages() {
    let fake = Arc::new(FakeControlPlane::new());
    fake.seed_jobs("default", "run6", 250);

    let snapshot = facade(&fake, json!({"limit": 100})).status().unwrap();

    assert_eq!(snapshot.total, 250);
    assert_eq!(fake.calls(ControlPlaneOp::ListJobs), 3);
}

#[test]
fn test_status_counts_every_state() {
    let fake = Arc::new(FakeControlPlane::new());
    fake.seed_jobs("default", "run6", 5);
    fake.set_job_state("default", "run6-0", CompletionState::Succeeded);
    fake.set_job_state("default", "run6-1", CompletionState::Succeeded);
    fake.set_job_state("default", "run6-2", CompletionState::Failed);
    fake.set_job_state("default", "run6-3", CompletionState::Running);

    let snapshot = facade(&fake, json!({"limit": 2})).status().unwrap();

    assert_eq!(
        snapshot.to_string(),
        "total=5 pending=1 running=1 succeeded=2 failed=1"
    );
    assert!(!snapshot.is_settled());
}

#[test]
fn test_flaky_listing_fails_that_poll_only() {
    let fake = Arc::new(FakeControlPlane::new());
    fake.seed_jobs("default", "run6", 3);
    fake.inject(
        ControlPlaneOp::ListJobs,
        FailureConfig::error(ControlPlaneError::unavailable("i/o timeout")).with_fail_count(1),
    );
    let facade = facade(&fake, json!({}));

    let err = facade.status().unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::ControlPlane);
    assert_eq!(facade.status().unwrap().total, 3);
}

#[test]
fn test_watch_stops_on_listing_failure() {
    let fake = Arc::new(FakeControlPlane::new());
    fake.seed_jobs("default", "run6", 1);
    fake.inject(
        ControlPlaneOp::ListJobs,
        FailureConfig::error(ControlPlaneError::unavailable("connection refused")),
    );
    let mut ticks = 0;

    let err = facade(&fake, json!({}))
        .watch_with(&StatusWatcher::new(Duration::from_millis(1)), |_| {
            ticks += 1;
            Ok(())
        })
        .unwrap_err();

    assert_eq!(ticks, 0);
    assert_eq!(err.exit_code(), ExitCode::ControlPlane);
}

#[test]
fn test_watch_reports_progress() {
    let fake = Arc::new(FakeControlPlane::new());
    fake.seed_jobs("default", "run6", 2);
    let mut lines = Vec::new();

    let ticks = facade(&fake, json!({}))
        .watch_with(
            &StatusWatcher::new(Duration::from_millis(1)).with_max_ticks(2),
            |tick| {
                lines.push(tick.line());
                Ok(())
            },
        )
        .unwrap();

    assert_eq!(ticks, 2);
    assert!(lines
        .iter()
        .all(|l| l.ends_with("total=2 pending=2 running=0 succeeded=0 failed=0")));
}

// =============================================================================
// Cleanup
// =============================================================================

#[test]
fn test_cleanup_then_status_is_empty() {
    let fake = Arc::new(FakeControlPlane::new());
    fake.seed_jobs("default", "run6", 25);
    let facade = facade(&fake, json!({"limit": 10}));

    let report = facade.cleanup().unwrap();
    assert!(report.is_clean());

    assert_eq!(facade.status().unwrap().total, 0);
}

#[test]
fn test_cleanup_leaves_foreign_jobs() {
    let fake = Arc::new(FakeControlPlane::new());
    fake.seed_jobs("default", "run6", 2);
    fake.seed_foreign_job("default", "nightly-backup");

    facade(&fake, json!({})).cleanup().unwrap();

    assert_eq!(fake.job_names("default"), vec!["nightly-backup"]);
}

#[test]
fn test_cleanup_collects_failures() {
    let fake = Arc::new(FakeControlPlane::new());
    fake.seed_jobs("default", "run6", 4);
    fake.fail_on(
        ControlPlaneOp::DeleteJob,
        Some("run6-2"),
        ControlPlaneError::unavailable("etcdserver: request timed out"),
    );

    let report = facade(&fake, json!({})).cleanup().unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(report.exit_code(), ExitCode::PartialFailure);
    assert_eq!(fake.calls(ControlPlaneOp::DeleteJob), 4);
}

#[test]
fn test_controller_delete_all_on_empty_namespace() {
    let fake = Arc::new(FakeControlPlane::new());
    let report = JobLifecycleController::new(fake.clone())
        .delete_all("default", 100)
        .unwrap();

    assert!(report.is_empty());
    assert_eq!(report.human_summary(), "cleanup: nothing to do");
}
