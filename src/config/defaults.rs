//! Built-in defaults (layer 1)
//!
//! Hardcoded defaults for every configuration value. Values match the
//! settings the demo deployments were run with.

use serde::{Deserialize, Serialize};

/// Page size used by `submit`.
pub const SUBMIT_PAGE_LIMIT: u32 = 200;

/// Page size used by `prepare`, `status`, `watch` and `cleanup`.
pub const DEFAULT_PAGE_LIMIT: u32 = 1000;

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    pub namespace: String,
    pub page_limit: u32,
    pub watch_interval_seconds: u64,
    pub run: String,
    pub image: String,
    pub cpu_limit: String,
    pub backoff_limit: u32,
    pub storage_type: String,
    pub bucket: String,
    pub output_bucket: String,
    pub multipart_threads: u32,
    pub download_max_kb: u64,
    pub upload_max_kb: u64,
    pub output_file: String,
    pub output_json_file: String,
    pub redis_host: String,
    pub gcs_project_id: String,
    pub gcs_region: String,
    pub cluster_prefix: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
            watch_interval_seconds: 1,
            run: "run6".to_string(),
            image: "lukasheinrich/cms-higgs-4l-full".to_string(),
            cpu_limit: "900m".to_string(),
            backoff_limit: 5,
            storage_type: "s3".to_string(),
            bucket: "higgs-demo-nl".to_string(),
            output_bucket: "higgs-demo-nl".to_string(),
            multipart_threads: 10,
            download_max_kb: 50000,
            upload_max_kb: 10000,
            output_file: "/tmp/output.root".to_string(),
            output_json_file: "/tmp/output.json".to_string(),
            redis_host: "10.0.0.4".to_string(),
            gcs_project_id: "nimble-valve-236407".to_string(),
            gcs_region: "europe-west4".to_string(),
            cluster_prefix: "kubecon-demo-".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Defaults for `submit`, which lists in smaller pages.
    pub fn for_submit() -> Self {
        Self {
            page_limit: SUBMIT_PAGE_LIMIT,
            ..Self::default()
        }
    }

    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "namespace": self.namespace,
            "cluster": null,
            "limit": self.page_limit,
            "watch_interval_seconds": self.watch_interval_seconds,
            "run": self.run,
            "image": self.image,
            "cpu_limit": self.cpu_limit,
            "backoff_limit": self.backoff_limit,
            "storage": {
                "type": self.storage_type,
                "host": "",
                "access_key": "",
                "secret_key": "",
                "bucket": self.bucket,
                "output_bucket": self.output_bucket,
                "multipart_threads": self.multipart_threads,
                "download_max_kb": self.download_max_kb,
                "upload_max_kb": self.upload_max_kb
            },
            "output": {
                "file": self.output_file,
                "json_file": self.output_json_file
            },
            "redis_host": self.redis_host,
            "gcp": {
                "project_id": self.gcs_project_id,
                "region": self.gcs_region,
                "cluster_prefix": self.cluster_prefix
            },
            "dataset": {
                "mapping": null,
                "pattern": null,
                "index": null
            }
        })
    }
}
