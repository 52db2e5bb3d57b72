//! Deployment entry point
//!
//! [`DeploymentFacade`] wires a resolved [`Configuration`] into the job
//! controller and watcher. It keeps no state between calls: every operation
//! rediscovers what exists from the control plane.

use std::io;
use std::path::Path;
use std::sync::Arc;

use batchfleet_api::ControlPlaneError;
use batchfleet_manifest::{DatasetManifest, DatasetPattern, ManifestError};
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, Configuration};
use crate::fleet::FleetError;
use crate::host::JobApi;
use crate::jobs::{build_prepull, ControllerError, JobLifecycleController, StatusSnapshot, PREPULL_NAME};
use crate::partition::{partition, PartitionError, UnitTemplate, WorkUnit};
use crate::summary::{BatchReport, CleanupReport, ExitCode};
use crate::watch::{StatusWatcher, Tick, WatchError};

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Invalid selection: {0}")]
    Selection(#[from] PartitionError),

    #[error(transparent)]
    Fleet(#[from] FleetError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error("Failed to {action}: {source}")]
    ControlPlane {
        action: String,
        #[source]
        source: ControlPlaneError,
    },

    #[error("Status poll failed: {0}")]
    Poll(#[source] ControllerError),

    #[error("Failed to write status: {0}")]
    Output(#[source] io::Error),
}

impl From<WatchError<io::Error>> for DeployError {
    fn from(err: WatchError<io::Error>) -> Self {
        match err {
            WatchError::Poll(e) => DeployError::Poll(e),
            WatchError::Observer(e) => DeployError::Output(e),
        }
    }
}

impl DeployError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            DeployError::Config(_) | DeployError::Manifest(_) | DeployError::Output(_) => {
                ExitCode::Configuration
            }
            DeployError::Selection(_) => ExitCode::InvalidSelection,
            DeployError::Fleet(FleetError::Collision { .. }) => ExitCode::FleetCollision,
            DeployError::Fleet(FleetError::List { .. }) => ExitCode::ControlPlane,
            DeployError::Fleet(FleetError::Manifest(_)) => ExitCode::Configuration,
            DeployError::Controller(_) | DeployError::ControlPlane { .. } | DeployError::Poll(_) => {
                ExitCode::ControlPlane
            }
        }
    }
}

/// Load the manifest at `path`.
pub fn load_manifest(path: &Path) -> Result<DatasetManifest, DeployError> {
    let manifest = DatasetManifest::load(path)?;
    info!(path = %path.display(), entries = manifest.len(), "Loaded dataset manifest");
    Ok(manifest)
}

pub struct DeploymentFacade {
    config: Configuration,
    jobs: JobLifecycleController,
    api: Arc<dyn JobApi>,
}

impl DeploymentFacade {
    pub fn new(config: Configuration, api: Arc<dyn JobApi>) -> Self {
        Self {
            jobs: JobLifecycleController::new(Arc::clone(&api)),
            config,
            api,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Have every node pull the worker image ahead of submission.
    pub fn prepare(&self) -> Result<(), DeployError> {
        let namespace = &self.config.namespace;
        let daemon_set = build_prepull(&self.config.image, namespace);
        self.api
            .apply_daemon_set(namespace, &daemon_set)
            .map_err(|source| DeployError::ControlPlane {
                action: format!("apply DaemonSet {}", PREPULL_NAME),
                source,
            })?;
        info!(namespace = %namespace, image = %self.config.image, "Pre-pull DaemonSet applied");
        Ok(())
    }

    /// The work units this configuration selects.
    ///
    /// With a mapping file, a pattern filters its entries. A pattern alone
    /// becomes a single unit processing everything it matches.
    pub fn plan(&self) -> Result<Vec<WorkUnit>, DeployError> {
        let selection = &self.config.selection;
        let template = Arc::new(UnitTemplate::from_config(&self.config));

        let units = match (&selection.mapping, &selection.pattern) {
            (Some(path), pattern) => {
                let manifest = load_manifest(path)?;
                let pattern = pattern.as_deref().map(DatasetPattern::new).transpose()?;
                partition(&manifest, &template, pattern.as_ref(), selection.index)?
            }
            (None, Some(pattern)) => {
                let manifest = DatasetManifest::from_pattern(pattern);
                partition(&manifest, &template, None, selection.index)?
            }
            (None, None) => return Err(ConfigError::MissingSelection.into()),
        };
        Ok(units)
    }

    /// Create one job per selected unit.
    pub fn submit(&self) -> Result<BatchReport, DeployError> {
        let units = self.plan()?;
        info!(
            namespace = %self.config.namespace,
            run = %self.config.run,
            units = units.len(),
            "Submitting jobs"
        );
        Ok(self.jobs.submit_all(&self.config.namespace, &units))
    }

    pub fn status(&self) -> Result<StatusSnapshot, DeployError> {
        Ok(self
            .jobs
            .list_status(&self.config.namespace, self.config.page_limit)?)
    }

    /// Poll status until the observer or a poll fails.
    pub fn watch<F>(&self, observer: F) -> Result<u64, DeployError>
    where
        F: FnMut(&Tick) -> Result<(), io::Error>,
    {
        self.watch_with(&StatusWatcher::new(self.config.watch_interval), observer)
    }

    pub fn watch_with<F>(&self, watcher: &StatusWatcher, observer: F) -> Result<u64, DeployError>
    where
        F: FnMut(&Tick) -> Result<(), io::Error>,
    {
        let source = self
            .jobs
            .status_source(&self.config.namespace, self.config.page_limit);
        Ok(watcher.watch(&source, observer)?)
    }

    /// Delete every managed job, then the pre-pull DaemonSet.
    pub fn cleanup(&self) -> Result<CleanupReport, DeployError> {
        let namespace = &self.config.namespace;
        let mut report = self.jobs.delete_all(namespace, self.config.page_limit)?;
        let result = self.api.delete_daemon_set(namespace, PREPULL_NAME);
        report.record(PREPULL_NAME, result);
        Ok(report)
    }
}
