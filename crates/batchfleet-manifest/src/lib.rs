//! Dataset manifest for batchfleet.
//!
//! A manifest is a JSON array of dataset records. Each record names a
//! dataset, optionally lists its input files or a source pattern, and carries
//! the machine flavor and node count of the cluster that processes it. The
//! position of a record in the array is its canonical identity: job names and
//! cluster names are derived from it.

mod entry;
mod error;
mod pattern;

pub use entry::{DatasetEntry, DatasetSource};
pub use error::ManifestError;
pub use pattern::DatasetPattern;

use std::path::Path;

/// Ordered, immutable sequence of dataset records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetManifest {
    entries: Vec<DatasetEntry>,
}

impl DatasetManifest {
    /// Load a manifest file from disk.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Err(ManifestError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a manifest from its JSON text.
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let entries: Vec<DatasetEntry> = serde_json::from_str(content)?;
        Self::from_entries(entries)
    }

    /// Build a manifest from already-constructed entries, validating them.
    pub fn from_entries(entries: Vec<DatasetEntry>) -> Result<Self, ManifestError> {
        let manifest = Self { entries };
        manifest.validate()?;
        Ok(manifest)
    }

    /// A single-entry manifest whose only dataset is the pattern itself.
    ///
    /// Used when a submission names a source pattern without a mapping file:
    /// one job processes everything the pattern selects.
    pub fn from_pattern(pattern: &str) -> Self {
        Self {
            entries: vec![DatasetEntry::from_pattern(pattern)],
        }
    }

    fn validate(&self) -> Result<(), ManifestError> {
        for (index, entry) in self.entries.iter().enumerate() {
            entry.validate(index)?;
        }
        Ok(())
    }

    /// Entry at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&DatasetEntry> {
        self.entries.get(index)
    }

    /// Entries in manifest order.
    pub fn entries(&self) -> &[DatasetEntry] {
        &self.entries
    }

    /// `(index, entry)` pairs in manifest order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &DatasetEntry)> {
        self.entries.iter().enumerate()
    }

    /// `(index, entry)` pairs whose dataset identity matches `pattern`,
    /// preserving manifest order.
    pub fn matching<'a>(
        &'a self,
        pattern: &'a DatasetPattern,
    ) -> impl Iterator<Item = (usize, &'a DatasetEntry)> + 'a {
        self.iter().filter(move |(_, entry)| pattern.matches(&entry.dataset))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
