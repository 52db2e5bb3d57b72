//! Merged configuration layers with provenance
//!
//! The effective config is the raw merged JSON object before it is typed. It
//! remembers which layers contributed so `-v` runs can log where a value came
//! from, and it renders a redacted copy for logging.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use super::ConfigError;

/// Origin of a configuration layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Host,
    Cli,
}

/// A contributing layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    /// The merged configuration object
    pub config: Value,

    /// Contributing layers in precedence order
    pub sources: Vec<ConfigSource>,
}

/// Key fragments whose values never reach a log line.
const SECRET_KEYS: &[&str] = &["secret", "access_key", "password", "token"];

const REDACTED: &str = "[REDACTED]";

impl EffectiveConfig {
    /// Merge builtin defaults, an optional host TOML file and CLI overrides.
    ///
    /// A host path that is given but does not exist is an error; callers
    /// that only want the file when present must check before passing it.
    pub fn build(
        defaults: &BuiltinDefaults,
        host_config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![defaults.to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
        }];

        if let Some(path) = host_config_path {
            layers.push(load_toml_file(path)?);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Host,
                path: Some(path.display().to_string()),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
            });
        }

        Ok(Self {
            config: merge_layers(layers),
            sources,
        })
    }

    /// Copy of the merged object with credential values masked.
    pub fn redacted(&self) -> Value {
        let mut copy = self.config.clone();
        redact(&mut copy);
        copy
    }

    /// Get a config value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.config, |current, part| current.get(part))
    }
}

fn load_toml_file(path: &Path) -> Result<Value, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    toml::from_str(&contents)
        .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
}

fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let key_lower = key.to_lowercase();
                let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));
                match val {
                    Value::String(s) if is_secret && !s.is_empty() => {
                        *val = Value::String(REDACTED.to_string());
                    }
                    _ => redact(val),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_build_with_defaults_only() {
        let config = EffectiveConfig::build(&BuiltinDefaults::default(), None, None).unwrap();

        assert_eq!(config.get("namespace"), Some(&json!("default")));
        assert_eq!(config.get("storage.type"), Some(&json!("s3")));
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].origin, ConfigOrigin::Builtin);
    }

    #[test]
    fn test_host_file_then_cli() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "namespace = \"higgs\"").unwrap();
        writeln!(temp, "limit = 500").unwrap();
        writeln!(temp, "[storage]").unwrap();
        writeln!(temp, "host = \"minio.internal:9000\"").unwrap();

        let cli = json!({"limit": 50, "namespace": null});
        let config =
            EffectiveConfig::build(&BuiltinDefaults::default(), Some(temp.path()), Some(cli))
                .unwrap();

        assert_eq!(config.get("namespace"), Some(&json!("higgs")));
        assert_eq!(config.get("limit"), Some(&json!(50)));
        assert_eq!(config.get("storage.host"), Some(&json!("minio.internal:9000")));
        assert_eq!(config.get("storage.bucket"), Some(&json!("higgs-demo-nl")));

        let origins: Vec<_> = config.sources.iter().map(|s| s.origin).collect();
        assert_eq!(
            origins,
            vec![ConfigOrigin::Builtin, ConfigOrigin::Host, ConfigOrigin::Cli]
        );
    }

    #[test]
    fn test_missing_host_file() {
        let result = EffectiveConfig::build(
            &BuiltinDefaults::default(),
            Some(Path::new("/nonexistent/batchfleet.toml")),
            None,
        );
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_malformed_host_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "namespace = ").unwrap();

        let result = EffectiveConfig::build(&BuiltinDefaults::default(), Some(temp.path()), None);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_redacted_masks_credentials() {
        let cli = json!({"storage": {"access_key": "AKIA", "secret_key": "s3cr3t"}});
        let config = EffectiveConfig::build(&BuiltinDefaults::default(), None, Some(cli)).unwrap();

        let redacted = config.redacted();
        assert_eq!(redacted["storage"]["access_key"], "[REDACTED]");
        assert_eq!(redacted["storage"]["secret_key"], "[REDACTED]");
        assert_eq!(redacted["storage"]["bucket"], "higgs-demo-nl");
        assert_eq!(config.get("storage.secret_key"), Some(&json!("s3cr3t")));
    }

    #[test]
    fn test_empty_secret_left_visible() {
        let config = EffectiveConfig::build(&BuiltinDefaults::default(), None, None).unwrap();
        assert_eq!(config.redacted()["storage"]["secret_key"], "");
    }
}
