//! Control-plane error classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable classification of a control-plane failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// An object with the same name already exists.
    AlreadyExists,
    /// The named object does not exist.
    NotFound,
    /// The caller's credentials do not allow the operation.
    Forbidden,
    /// The request was rejected as malformed.
    Invalid,
    /// The control plane could not be reached or did not answer.
    Unavailable,
    /// Anything else.
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists => write!(f, "ALREADY_EXISTS"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Forbidden => write!(f, "FORBIDDEN"),
            Self::Invalid => write!(f, "INVALID"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// A failed control-plane call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ControlPlaneError {
    pub code: ErrorCode,
    /// Single-line description, usually the tool's own error text.
    pub message: String,
}

impl ControlPlaneError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn already_exists(kind: &str, name: &str) -> Self {
        Self::new(
            ErrorCode::AlreadyExists,
            format!("{} \"{}\" already exists", kind, name),
        )
    }

    pub fn not_found(kind: &str, name: &str) -> Self {
        Self::new(ErrorCode::NotFound, format!("{} \"{}\" not found", kind, name))
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unavailable, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Invalid, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    /// Classify the stderr of a failed `kubectl` or `gcloud` invocation.
    pub fn from_stderr(stderr: &str) -> Self {
        let message = stderr
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("command failed without output")
            .to_string();
        Self::new(classify_stderr(stderr), message)
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }

    pub fn is_already_exists(&self) -> bool {
        self.code == ErrorCode::AlreadyExists
    }
}

fn classify_stderr(stderr: &str) -> ErrorCode {
    let lower = stderr.to_lowercase();
    if lower.contains("alreadyexists") || lower.contains("already exists") {
        ErrorCode::AlreadyExists
    } else if lower.contains("notfound") || lower.contains("not found") {
        ErrorCode::NotFound
    } else if lower.contains("forbidden") || lower.contains("permission_denied") {
        ErrorCode::Forbidden
    } else if lower.contains("invalid") {
        ErrorCode::Invalid
    } else if lower.contains("unable to connect")
        || lower.contains("connection refused")
        || lower.contains("i/o timeout")
        || lower.contains("deadline exceeded")
    {
        ErrorCode::Unavailable
    } else {
        ErrorCode::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_kubectl_already_exists() {
        let err = ControlPlaneError::from_stderr(
            "Error from server (AlreadyExists): error when creating \"STDIN\": jobs.batch \"run6-0\" already exists\n",
        );
        assert_eq!(err.code, ErrorCode::AlreadyExists);
        assert!(err.message.starts_with("Error from server (AlreadyExists)"));
    }

    #[test]
    fn test_classify_kubectl_not_found() {
        let err = ControlPlaneError::from_stderr(
            "Error from server (NotFound): jobs.batch \"run6-7\" not found",
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_classify_gcloud_forbidden() {
        let err = ControlPlaneError::from_stderr(
            "ERROR: (gcloud.container.clusters.list) ResponseError: code=403, message=Required \"container.clusters.list\" permission(s). PERMISSION_DENIED",
        );
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[test]
    fn test_classify_unreachable() {
        let err = ControlPlaneError::from_stderr(
            "The connection to the server localhost:8080 was refused - did you specify the right host or port?\nUnable to connect to the server",
        );
        assert_eq!(err.code, ErrorCode::Unavailable);
    }

    #[test]
    fn test_empty_stderr() {
        let err = ControlPlaneError::from_stderr("\n  \n");
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "command failed without output");
    }

    #[test]
    fn test_display() {
        let err = ControlPlaneError::not_found("job", "run6-1");
        assert_eq!(err.to_string(), "NOT_FOUND: job \"run6-1\" not found");
    }
}
