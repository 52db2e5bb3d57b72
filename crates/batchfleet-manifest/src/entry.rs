use serde::{Deserialize, Serialize};

use crate::ManifestError;

/// One dataset record from the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetEntry {
    /// Dataset identity, matched by dataset patterns.
    #[serde(alias = "name")]
    pub dataset: String,

    /// Explicit input files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,

    /// Source pattern selecting the input files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Machine type of the cluster backing this dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,

    /// Node count of the cluster backing this dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<u32>,
}

/// Where a job finds the inputs of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetSource {
    Files(Vec<String>),
    Pattern(String),
}

impl DatasetEntry {
    pub(crate) fn from_pattern(pattern: &str) -> Self {
        Self {
            dataset: pattern.to_string(),
            files: Vec::new(),
            pattern: Some(pattern.to_string()),
            flavor: None,
            nodes: None,
        }
    }

    /// Input source. Explicit files win over a pattern; an entry with
    /// neither uses its identity as the pattern.
    pub fn source(&self) -> DatasetSource {
        if !self.files.is_empty() {
            DatasetSource::Files(self.files.clone())
        } else {
            let pattern = self.pattern.as_deref().unwrap_or(&self.dataset);
            DatasetSource::Pattern(pattern.to_string())
        }
    }

    /// Flavor and node count, required to provision a cluster.
    pub fn sizing(&self, index: usize) -> Result<(&str, u32), ManifestError> {
        let flavor = self.flavor.as_deref().ok_or_else(|| ManifestError::MissingField {
            index,
            field: "flavor".to_string(),
        })?;
        let nodes = self.nodes.ok_or_else(|| ManifestError::MissingField {
            index,
            field: "nodes".to_string(),
        })?;
        Ok((flavor, nodes))
    }

    pub(crate) fn validate(&self, index: usize) -> Result<(), ManifestError> {
        if self.dataset.trim().is_empty() {
            return Err(ManifestError::MissingField {
                index,
                field: "dataset".to_string(),
            });
        }

        if self.nodes == Some(0) {
            return Err(ManifestError::InvalidValue {
                index,
                field: "nodes".to_string(),
                reason: "node count must be positive".to_string(),
            });
        }

        if matches!(self.flavor.as_deref(), Some(f) if f.trim().is_empty()) {
            return Err(ManifestError::InvalidValue {
                index,
                field: "flavor".to_string(),
                reason: "flavor cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}
