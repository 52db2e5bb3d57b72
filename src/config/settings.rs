//! Typed view of the merged configuration object and its validation.

use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use super::storage::{s3_endpoint, GcsConfig, S3Config, Secret, StorageBackend, StorageType};
use super::{
    ConfigError, Configuration, DatasetSelection, GcpSettings, OutputTargets, ResourceLimits,
    Throughput,
};

/// Longest run label that still leaves room for `-{index}` in a 63 character name.
pub const MAX_RUN_LABEL_LEN: usize = 50;

const MAX_NAMESPACE_LEN: usize = 63;

#[derive(Debug, Deserialize)]
pub(crate) struct Settings {
    namespace: String,
    #[serde(default)]
    cluster: Option<String>,
    limit: u32,
    watch_interval_seconds: u64,
    run: String,
    image: String,
    cpu_limit: String,
    backoff_limit: u32,
    storage: StorageSettings,
    output: OutputSettings,
    redis_host: String,
    gcp: GcpSection,
    #[serde(default)]
    dataset: DatasetSection,
}

#[derive(Debug, Deserialize)]
struct StorageSettings {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    host: String,
    #[serde(default)]
    access_key: String,
    #[serde(default)]
    secret_key: String,
    bucket: String,
    output_bucket: String,
    multipart_threads: u32,
    download_max_kb: u64,
    upload_max_kb: u64,
}

#[derive(Debug, Deserialize)]
struct OutputSettings {
    file: String,
    json_file: String,
}

#[derive(Debug, Deserialize)]
struct GcpSection {
    project_id: String,
    region: String,
    cluster_prefix: String,
}

#[derive(Debug, Default, Deserialize)]
struct DatasetSection {
    mapping: Option<PathBuf>,
    pattern: Option<String>,
    index: Option<usize>,
}

impl Settings {
    pub(crate) fn from_value(value: Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate every field and build the immutable configuration.
    pub(crate) fn resolve(self) -> Result<Configuration, ConfigError> {
        validate_namespace(&self.namespace)?;
        validate_run_label(&self.run)?;

        if self.limit == 0 {
            return Err(invalid("limit", "must be at least 1"));
        }
        if self.watch_interval_seconds == 0 {
            return Err(invalid("watch_interval_seconds", "must be at least 1"));
        }
        require_non_empty("image", &self.image)?;
        require_non_empty("cpu_limit", &self.cpu_limit)?;
        require_non_empty("storage.bucket", &self.storage.bucket)?;
        require_non_empty("storage.output_bucket", &self.storage.output_bucket)?;
        if self.storage.multipart_threads == 0 {
            return Err(invalid("storage.multipart_threads", "must be at least 1"));
        }
        if self.storage.download_max_kb == 0 || self.storage.upload_max_kb == 0 {
            return Err(invalid("storage", "throughput caps must be at least 1 KB"));
        }
        if self.storage.access_key.is_empty() != self.storage.secret_key.is_empty() {
            return Err(invalid(
                "storage",
                "access_key and secret_key must be given together",
            ));
        }
        require_non_empty("gcp.project_id", &self.gcp.project_id)?;
        require_non_empty("gcp.region", &self.gcp.region)?;

        let storage_type: StorageType = self.storage.kind.parse()?;
        let storage = match storage_type {
            StorageType::S3 => StorageBackend::S3(S3Config {
                endpoint: s3_endpoint(&self.storage.host),
                access_key: Secret::new(self.storage.access_key),
                secret_key: Secret::new(self.storage.secret_key),
                multipart_threads: self.storage.multipart_threads,
                download_max_kb: self.storage.download_max_kb,
                upload_max_kb: self.storage.upload_max_kb,
            }),
            StorageType::Gcs => StorageBackend::Gcs(GcsConfig {
                endpoint: Some(self.storage.host.trim().to_string()).filter(|h| !h.is_empty()),
                project_id: self.gcp.project_id.clone(),
                access_key: Secret::new(self.storage.access_key),
                secret_key: Secret::new(self.storage.secret_key),
            }),
        };

        Ok(Configuration {
            namespace: self.namespace,
            cluster: self.cluster.filter(|c| !c.is_empty()),
            page_limit: self.limit,
            watch_interval: Duration::from_secs(self.watch_interval_seconds),
            run: self.run,
            image: self.image,
            resources: ResourceLimits {
                cpu: self.cpu_limit,
            },
            backoff_limit: self.backoff_limit,
            storage,
            input_bucket: self.storage.bucket,
            throughput: Throughput {
                multipart_threads: self.storage.multipart_threads,
                download_max_kb: self.storage.download_max_kb,
                upload_max_kb: self.storage.upload_max_kb,
            },
            outputs: OutputTargets {
                bucket: self.storage.output_bucket,
                file: self.output.file,
                json_file: self.output.json_file,
            },
            redis_host: self.redis_host,
            gcp: GcpSettings {
                project_id: self.gcp.project_id,
                region: self.gcp.region,
                cluster_prefix: self.gcp.cluster_prefix,
            },
            selection: DatasetSelection {
                mapping: self.dataset.mapping,
                pattern: self.dataset.pattern.filter(|p| !p.is_empty()),
                index: self.dataset.index,
            },
        })
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn require_non_empty(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(invalid(key, "must not be empty"));
    }
    Ok(())
}

/// Run labels prefix every job name, so they follow DNS-1123 label rules.
pub fn validate_run_label(run: &str) -> Result<(), ConfigError> {
    if run.is_empty() || run.len() > MAX_RUN_LABEL_LEN {
        return Err(ConfigError::InvalidValue {
            key: "run".to_string(),
            reason: format!("must be 1-{} characters, got {}", MAX_RUN_LABEL_LEN, run.len()),
        });
    }
    if !run.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(invalid("run", "must start with a lowercase letter"));
    }
    if !run
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            "run",
            "may only contain lowercase letters, digits and '-'",
        ));
    }
    Ok(())
}

pub fn validate_namespace(namespace: &str) -> Result<(), ConfigError> {
    let alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    let valid = !namespace.is_empty()
        && namespace.len() <= MAX_NAMESPACE_LEN
        && namespace.starts_with(alnum)
        && namespace.ends_with(alnum)
        && namespace.chars().all(|c| alnum(c) || c == '-');
    if !valid {
        return Err(ConfigError::InvalidValue {
            key: "namespace".to_string(),
            reason: format!("'{}' is not a valid DNS-1123 label", namespace),
        });
    }
    Ok(())
}
