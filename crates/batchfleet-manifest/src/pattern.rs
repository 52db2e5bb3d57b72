use globset::{Glob, GlobMatcher};

use crate::ManifestError;

/// Shell-style glob matched against dataset identities.
///
/// `*` and `?` also match `/`, so `/SingleMuon*` selects every run of the
/// SingleMuon primary dataset.
#[derive(Debug, Clone)]
pub struct DatasetPattern {
    source: String,
    matcher: GlobMatcher,
}

impl DatasetPattern {
    pub fn new(pattern: &str) -> Result<Self, ManifestError> {
        let glob = Glob::new(pattern).map_err(|e| ManifestError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.kind().to_string(),
        })?;

        Ok(Self {
            source: pattern.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    pub fn matches(&self, dataset: &str) -> bool {
        self.matcher.is_match(dataset)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for DatasetPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for DatasetPattern {}
