//! Job lifecycle
//!
//! Submits one Job per work unit, pages through the managed Jobs of a
//! namespace to count them by state, and deletes them again. Nothing is
//! cached between calls: every listing re-reads the control plane.

mod builder;
mod status;

pub use builder::{
    build_job, build_prepull, job_env, managed_selector, DATASET_INDEX_LABEL, MANAGED_BY_LABEL,
    MANAGER, PREPULL_NAME, RUN_LABEL,
};
pub use status::{classify, CompletionState, JobRecord, StatusSnapshot};

use std::sync::Arc;

use batchfleet_api::{ControlPlaneError, ListParams};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::host::JobApi;
use crate::partition::WorkUnit;
use crate::summary::{BatchReport, CleanupReport};
use crate::watch::StatusSource;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("Failed to list jobs in namespace '{namespace}': {source}")]
    List {
        namespace: String,
        #[source]
        source: ControlPlaneError,
    },

    #[error("Job listing in namespace '{namespace}' returned the same continuation token twice")]
    StalledPagination { namespace: String },
}

pub struct JobLifecycleController {
    api: Arc<dyn JobApi>,
}

impl JobLifecycleController {
    pub fn new(api: Arc<dyn JobApi>) -> Self {
        Self { api }
    }

    /// Create one Job per unit, in order. A failed create is recorded and the
    /// batch carries on.
    pub fn submit_all(&self, namespace: &str, units: &[WorkUnit]) -> BatchReport {
        let mut report = BatchReport::new("submit");

        for unit in units {
            let job = build_job(unit, namespace);
            let result = self.api.create_job(namespace, &job);
            match result {
                Ok(()) => info!(job = %unit.job_name, dataset = %unit.dataset.name, "Submitted job"),
                Err(ref e) if e.is_already_exists() => {
                    warn!(job = %unit.job_name, "Job already exists, not resubmitting")
                }
                Err(ref e) => warn!(job = %unit.job_name, error = %e, "Job submission failed"),
            }
            report.record(&unit.job_name, result);
        }

        report
    }

    /// Every managed Job in `namespace`, fetched `page_limit` at a time.
    pub fn list_jobs(
        &self,
        namespace: &str,
        page_limit: u32,
    ) -> Result<Vec<JobRecord>, ControllerError> {
        let mut records = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let params = ListParams::new(page_limit)
                .labels(managed_selector())
                .continue_from(token.as_deref());
            let page = self
                .api
                .list_jobs(namespace, &params)
                .map_err(|source| ControllerError::List {
                    namespace: namespace.to_string(),
                    source,
                })?;
            pages += 1;

            records.extend(page.items.iter().map(|job| JobRecord::from_job(job, namespace)));

            match page.next_token() {
                Some(next) if token.as_deref() == Some(next) => {
                    return Err(ControllerError::StalledPagination {
                        namespace: namespace.to_string(),
                    });
                }
                Some(next) => token = Some(next.to_string()),
                None => break,
            }
        }

        debug!(namespace, pages, jobs = records.len(), "Listed jobs");
        Ok(records)
    }

    pub fn list_status(
        &self,
        namespace: &str,
        page_limit: u32,
    ) -> Result<StatusSnapshot, ControllerError> {
        Ok(self
            .list_jobs(namespace, page_limit)?
            .into_iter()
            .map(|record| record.state)
            .collect())
    }

    /// Delete every managed Job in `namespace`.
    ///
    /// The full listing is read before the first delete so removals cannot
    /// shift the pages still to be fetched. A job that is already gone counts
    /// as deleted.
    pub fn delete_all(
        &self,
        namespace: &str,
        page_limit: u32,
    ) -> Result<CleanupReport, ControllerError> {
        let records = self.list_jobs(namespace, page_limit)?;
        let mut report = BatchReport::new("cleanup");

        for record in &records {
            let result = match self.api.delete_job(namespace, &record.name) {
                Err(e) if e.is_not_found() => {
                    debug!(job = %record.name, "Job already gone");
                    Ok(())
                }
                other => other,
            };
            if let Err(ref e) = result {
                warn!(job = %record.name, error = %e, "Job deletion failed");
            }
            report.record(&record.name, result);
        }

        info!(namespace, deleted = report.succeeded(), failed = report.failed(), "Cleanup finished");
        Ok(report)
    }

    /// A [`StatusSource`] polling one namespace.
    pub fn status_source<'a>(&'a self, namespace: &'a str, page_limit: u32) -> NamespaceStatus<'a> {
        NamespaceStatus {
            controller: self,
            namespace,
            page_limit,
        }
    }
}

/// Polls the managed Jobs of one namespace.
pub struct NamespaceStatus<'a> {
    controller: &'a JobLifecycleController,
    namespace: &'a str,
    page_limit: u32,
}

impl StatusSource for NamespaceStatus<'_> {
    fn poll(&self) -> Result<StatusSnapshot, ControllerError> {
        self.controller.list_status(self.namespace, self.page_limit)
    }
}
