//! Batch outcomes and exit codes
//!
//! Submission, cleanup and fleet operations act on many items and never stop
//! at the first failure. Each records one result per item; the report decides
//! the process exit code once the batch is done.

use batchfleet_api::ControlPlaneError;
use serde::{Deserialize, Serialize};

/// Stable process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    /// Bad flags, config file or manifest
    Configuration = 1,
    /// Dataset index out of range
    InvalidSelection = 2,
    /// A fleet cluster name is already taken
    FleetCollision = 3,
    /// A fatal control-plane call failed
    ControlPlane = 4,
    /// The batch ran to completion but some items failed
    PartialFailure = 5,
}

impl ExitCode {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

/// Outcome for one item of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    pub name: String,
    pub error: Option<ControlPlaneError>,
}

impl ItemResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-item results of one batch operation, in the order items were processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub operation: String,
    pub results: Vec<ItemResult>,
}

/// Results of `create_fleet` / `delete_fleet`.
pub type FleetReport = BatchReport;

/// Results of `delete_all`.
pub type CleanupReport = BatchReport;

impl BatchReport {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            results: Vec::new(),
        }
    }

    pub fn record(&mut self, name: impl Into<String>, result: Result<(), ControlPlaneError>) {
        self.results.push(ItemResult {
            name: name.into(),
            error: result.err(),
        });
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemResult> {
        self.results.iter().filter(|r| !r.is_ok())
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_clean() {
            ExitCode::Success
        } else {
            ExitCode::PartialFailure
        }
    }

    pub fn human_summary(&self) -> String {
        if self.is_empty() {
            return format!("{}: nothing to do", self.operation);
        }
        if self.is_clean() {
            format!("{}: {}/{} succeeded", self.operation, self.succeeded(), self.len())
        } else {
            format!(
                "{}: {} succeeded, {} failed",
                self.operation,
                self.succeeded(),
                self.failed()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::Configuration.as_i32(), 1);
        assert_eq!(ExitCode::InvalidSelection.as_i32(), 2);
        assert_eq!(ExitCode::FleetCollision.as_i32(), 3);
        assert_eq!(ExitCode::ControlPlane.as_i32(), 4);
        assert_eq!(ExitCode::PartialFailure.as_i32(), 5);
        assert!(ExitCode::Success.is_success());
        assert!(!ExitCode::PartialFailure.is_success());
    }

    #[test]
    fn test_clean_report() {
        let mut report = BatchReport::new("submit");
        report.record("run6-0", Ok(()));
        report.record("run6-1", Ok(()));

        assert!(report.is_clean());
        assert_eq!(report.exit_code(), ExitCode::Success);
        assert_eq!(report.human_summary(), "submit: 2/2 succeeded");
    }

    #[test]
    fn test_report_with_failures() {
        let mut report = BatchReport::new("cleanup");
        report.record("run6-0", Ok(()));
        report.record(
            "run6-1",
            Err(ControlPlaneError::unavailable("connection refused")),
        );

        assert!(!report.is_clean());
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures().next().unwrap().name, "run6-1");
        assert_eq!(report.exit_code(), ExitCode::PartialFailure);
        assert_eq!(report.human_summary(), "cleanup: 1 succeeded, 1 failed");
    }

    #[test]
    fn test_empty_report() {
        let report = BatchReport::new("submit");
        assert!(report.is_clean());
        assert_eq!(report.human_summary(), "submit: nothing to do");
    }
}
