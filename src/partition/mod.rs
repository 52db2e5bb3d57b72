//! Dataset partitioning
//!
//! Turns a dataset manifest into the ordered list of work units `submit`
//! creates jobs for. Partitioning is pure: the same manifest, template and
//! filters always yield the same units with the same names.

use std::sync::Arc;

use batchfleet_manifest::{DatasetManifest, DatasetPattern, DatasetSource};
use thiserror::Error;
use tracing::warn;

use crate::config::{Configuration, OutputTargets, ResourceLimits, StorageBackend, Throughput};

/// Settings shared by every unit of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitTemplate {
    pub run: String,
    pub image: String,
    pub resources: ResourceLimits,
    pub backoff_limit: u32,
    pub storage: StorageBackend,
    pub input_bucket: String,
    pub throughput: Throughput,
    pub outputs: OutputTargets,
    pub redis_host: String,
    pub gcs_project_id: String,
}

impl UnitTemplate {
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            run: config.run.clone(),
            image: config.image.clone(),
            resources: config.resources.clone(),
            backoff_limit: config.backoff_limit,
            storage: config.storage.clone(),
            input_bucket: config.input_bucket.clone(),
            throughput: config.throughput,
            outputs: config.outputs.clone(),
            redis_host: config.redis_host.clone(),
            gcs_project_id: config.gcp.project_id.clone(),
        }
    }
}

/// The dataset a unit processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRef {
    pub name: String,
    pub source: DatasetSource,
}

/// One job's worth of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub job_name: String,
    /// Position of the dataset in the manifest.
    pub index: usize,
    pub dataset: DatasetRef,
    pub template: Arc<UnitTemplate>,
}

impl WorkUnit {
    pub fn run(&self) -> &str {
        &self.template.run
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartitionError {
    #[error("Dataset index {index} out of range: manifest has {len} entries")]
    InvalidSelection { index: usize, len: usize },
}

/// Job name for the dataset at `index` within `run`.
pub fn job_name(run: &str, index: usize) -> String {
    format!("{}-{}", run, index)
}

/// Partition `manifest` into work units.
///
/// An explicit index selects exactly that entry and takes precedence over a
/// pattern. A pattern keeps the matching entries in manifest order, and an
/// empty match is not an error. With neither, every entry becomes a unit.
pub fn partition(
    manifest: &DatasetManifest,
    template: &Arc<UnitTemplate>,
    pattern: Option<&DatasetPattern>,
    explicit_index: Option<usize>,
) -> Result<Vec<WorkUnit>, PartitionError> {
    let unit = |index: usize, name: &str, source: DatasetSource| WorkUnit {
        job_name: job_name(&template.run, index),
        index,
        dataset: DatasetRef {
            name: name.to_string(),
            source,
        },
        template: Arc::clone(template),
    };

    if let Some(index) = explicit_index {
        if let Some(pattern) = pattern {
            warn!(
                index,
                pattern = pattern.as_str(),
                "Both dataset index and pattern given; ignoring pattern"
            );
        }
        let entry = manifest.get(index).ok_or(PartitionError::InvalidSelection {
            index,
            len: manifest.len(),
        })?;
        return Ok(vec![unit(index, &entry.dataset, entry.source())]);
    }

    let units = match pattern {
        Some(pattern) => manifest
            .matching(pattern)
            .map(|(index, entry)| unit(index, &entry.dataset, entry.source()))
            .collect(),
        None => manifest
            .iter()
            .map(|(index, entry)| unit(index, &entry.dataset, entry.source()))
            .collect(),
    };
    Ok(units)
}
