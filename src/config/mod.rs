//! Layered configuration
//!
//! Three layers are merged, lowest precedence first:
//! 1. Built-in defaults
//! 2. Host config (`--config`, or ~/.config/batchfleet/config.toml when present)
//! 3. CLI flags
//!
//! The merged object is validated once and frozen into a [`Configuration`]
//! that every component borrows.

mod defaults;
mod effective;
mod merge;
mod settings;
mod storage;

pub use defaults::{BuiltinDefaults, DEFAULT_PAGE_LIMIT, SUBMIT_PAGE_LIMIT};
pub use effective::{ConfigOrigin, ConfigSource, EffectiveConfig};
pub use merge::{deep_merge, merge_layers};
pub use settings::{validate_namespace, validate_run_label, MAX_RUN_LABEL_LEN};
pub use storage::{GcsConfig, S3Config, Secret, StorageBackend, StorageType, TransferCommand};

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use settings::Settings;

/// Per-invocation configuration. Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub namespace: String,
    /// kubectl context; `None` uses the current context.
    pub cluster: Option<String>,
    pub page_limit: u32,
    pub watch_interval: Duration,
    pub run: String,
    pub image: String,
    pub resources: ResourceLimits,
    pub backoff_limit: u32,
    pub storage: StorageBackend,
    pub input_bucket: String,
    pub throughput: Throughput,
    pub outputs: OutputTargets,
    /// Work-queue endpoint handed to every job.
    pub redis_host: String,
    pub gcp: GcpSettings,
    pub selection: DatasetSelection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    /// CPU quantity used as both request and limit, e.g. `900m`.
    pub cpu: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throughput {
    pub multipart_threads: u32,
    pub download_max_kb: u64,
    pub upload_max_kb: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTargets {
    pub bucket: String,
    pub file: String,
    pub json_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcpSettings {
    pub project_id: String,
    pub region: String,
    pub cluster_prefix: String,
}

/// Which manifest entries an invocation works on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSelection {
    pub mapping: Option<PathBuf>,
    pub pattern: Option<String>,
    pub index: Option<usize>,
}

impl Configuration {
    /// Merge the layers and resolve them into a validated configuration.
    pub fn load(
        defaults: &BuiltinDefaults,
        host_config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let effective = EffectiveConfig::build(defaults, host_config_path, cli_overrides)?;
        debug!(
            sources = ?effective.sources,
            config = %effective.redacted(),
            "Resolved configuration layers"
        );
        Settings::from_value(effective.config)?.resolve()
    }

    /// Configuration from builtin defaults plus CLI-style overrides only.
    pub fn from_overrides(overrides: Value) -> Result<Self, ConfigError> {
        Self::load(&BuiltinDefaults::default(), None, Some(overrides))
    }
}

/// `~/.config/batchfleet/config.toml`, when HOME is set and the file exists.
pub fn default_host_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    let path = PathBuf::from(home)
        .join(".config")
        .join("batchfleet")
        .join("config.toml");
    path.exists().then_some(path)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("No dataset selection: pass --dataset-mapping or --dataset-pattern")]
    MissingSelection,
}
