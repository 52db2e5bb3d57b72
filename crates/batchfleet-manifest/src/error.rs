use std::path::PathBuf;

/// Errors raised while loading or querying a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse manifest JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("manifest file not found: {0}")]
    NotFound(PathBuf),

    #[error("manifest entry {index}: missing required field '{field}'")]
    MissingField { index: usize, field: String },

    #[error("manifest entry {index}: invalid value for '{field}': {reason}")]
    InvalidValue {
        index: usize,
        field: String,
        reason: String,
    },

    #[error("invalid dataset pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
