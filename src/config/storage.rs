//! Object-storage backends
//!
//! The backend is chosen once, when the configuration is resolved. Jobs never
//! talk to the orchestrator about storage: they receive the transfer commands
//! and environment the backend renders here and run them inside the worker
//! image.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use super::ConfigError;

/// Alias under which `mc` addresses the configured S3 endpoint.
const MC_ALIAS: &str = "storage";

const DEFAULT_S3_ENDPOINT: &str = "https://s3.amazonaws.com";

/// A credential that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "\"\"")
        } else {
            write!(f, "[REDACTED]")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    S3,
    Gcs,
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::S3 => write!(f, "s3"),
            StorageType::Gcs => write!(f, "gcs"),
        }
    }
}

impl FromStr for StorageType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" => Ok(StorageType::S3),
            "gcs" => Ok(StorageType::Gcs),
            _ => Err(ConfigError::InvalidValue {
                key: "storage.type".to_string(),
                reason: format!("unknown storage type '{}', expected s3 or gcs", s),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    /// Endpoint URL including scheme.
    pub endpoint: String,
    pub access_key: Secret,
    pub secret_key: Secret,
    pub multipart_threads: u32,
    pub download_max_kb: u64,
    pub upload_max_kb: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsConfig {
    /// JSON API host override; `None` uses the public endpoint.
    pub endpoint: Option<String>,
    pub project_id: String,
    pub access_key: Secret,
    pub secret_key: Secret,
}

/// A program invocation the job container runs to move one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl TransferCommand {
    fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
        }
    }
}

impl fmt::Display for TransferCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Storage backend resolved from `storage.type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    S3(S3Config),
    Gcs(GcsConfig),
}

impl StorageBackend {
    pub fn kind(&self) -> StorageType {
        match self {
            StorageBackend::S3(_) => StorageType::S3,
            StorageBackend::Gcs(_) => StorageType::Gcs,
        }
    }

    /// Command that copies `bucket/object` to the local path `dest`.
    pub fn download(&self, bucket: &str, object: &str, dest: &str) -> TransferCommand {
        match self {
            StorageBackend::S3(s3) => TransferCommand::new(
                "mc",
                vec![
                    "--quiet".to_string(),
                    "cp".to_string(),
                    "--limit-download".to_string(),
                    format!("{}KiB", s3.download_max_kb),
                    s3_path(bucket, object),
                    dest.to_string(),
                ],
            ),
            StorageBackend::Gcs(gcs) => {
                let mut args = gsutil_options(gcs);
                args.extend(["cp".to_string(), gcs_path(bucket, object), dest.to_string()]);
                TransferCommand::new("gsutil", args)
            }
        }
    }

    /// Command that copies the local path `src` to `bucket/object`.
    pub fn upload(&self, src: &str, bucket: &str, object: &str) -> TransferCommand {
        match self {
            StorageBackend::S3(s3) => TransferCommand::new(
                "mc",
                vec![
                    "--quiet".to_string(),
                    "cp".to_string(),
                    "--limit-upload".to_string(),
                    format!("{}KiB", s3.upload_max_kb),
                    src.to_string(),
                    s3_path(bucket, object),
                ],
            ),
            StorageBackend::Gcs(gcs) => {
                let mut args = gsutil_options(gcs);
                args.extend(["cp".to_string(), src.to_string(), gcs_path(bucket, object)]);
                TransferCommand::new("gsutil", args)
            }
        }
    }

    /// Backend-specific environment for the job container.
    pub fn env(&self) -> Vec<(String, String)> {
        match self {
            StorageBackend::S3(s3) => vec![
                (format!("MC_HOST_{}", MC_ALIAS), mc_host_url(s3)),
                ("MC_THREADS".to_string(), s3.multipart_threads.to_string()),
            ],
            StorageBackend::Gcs(gcs) => {
                let mut env = vec![("CLOUDSDK_CORE_PROJECT".to_string(), gcs.project_id.clone())];
                if !gcs.access_key.is_empty() {
                    env.push(("GS_ACCESS_KEY_ID".to_string(), gcs.access_key.expose().to_string()));
                    env.push((
                        "GS_SECRET_ACCESS_KEY".to_string(),
                        gcs.secret_key.expose().to_string(),
                    ));
                }
                env
            }
        }
    }

    /// Endpoint the backend talks to, for display and job metadata.
    pub fn endpoint(&self) -> &str {
        match self {
            StorageBackend::S3(s3) => &s3.endpoint,
            StorageBackend::Gcs(gcs) => gcs.endpoint.as_deref().unwrap_or("storage.googleapis.com"),
        }
    }
}

/// Normalise a user-supplied S3 host into an endpoint URL.
pub(crate) fn s3_endpoint(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        DEFAULT_S3_ENDPOINT.to_string()
    } else if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// `mc` endpoint with the credentials as percent-encoded userinfo.
fn mc_host_url(s3: &S3Config) -> String {
    if s3.access_key.is_empty() {
        return s3.endpoint.clone();
    }
    let mut url = match Url::parse(&s3.endpoint) {
        Ok(url) => url,
        Err(e) => {
            warn!(endpoint = %s3.endpoint, error = %e, "S3 endpoint is not a URL, credentials not embedded");
            return s3.endpoint.clone();
        }
    };
    if url.set_username(s3.access_key.expose()).is_err()
        || url.set_password(Some(s3.secret_key.expose())).is_err()
    {
        warn!(endpoint = %s3.endpoint, "S3 endpoint cannot carry credentials");
        return s3.endpoint.clone();
    }
    url.as_str().trim_end_matches('/').to_string()
}

fn s3_path(bucket: &str, object: &str) -> String {
    format!("{}/{}/{}", MC_ALIAS, bucket, object.trim_start_matches('/'))
}

fn gcs_path(bucket: &str, object: &str) -> String {
    format!("gs://{}/{}", bucket, object.trim_start_matches('/'))
}

fn gsutil_options(gcs: &GcsConfig) -> Vec<String> {
    let mut args = vec!["-q".to_string()];
    if let Some(ref host) = gcs.endpoint {
        args.push("-o".to_string());
        args.push(format!("Credentials:gs_json_host={}", host));
    }
    args
}
