use serde::Deserialize;
use std::{env, fmt, fs, path::Path, path::PathBuf, time::Duration};

use crate::orchestrator::FailurePolicy;
use crate::types::CallerAddress;

/// Errors raised while loading node configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The config file could not be read.
    Io { path: PathBuf, message: String },

    /// The config file is not valid JSON for `NodeConfig`.
    Parse(String),

    /// An environment override could not be parsed.
    Env { var: String, value: String },

    /// A value is out of range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "Could not read {}: {}", path.display(), message)
            }
            Self::Parse(msg) => write!(f, "Invalid config: {}", msg),
            Self::Env { var, value } => write!(f, "Invalid value for {}: `{}`", var, value),
            Self::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings for one grid node.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodeConfig {
    /// Address this node stamps as the caller of the operations it sends.
    pub member_address: CallerAddress,
    /// Number of workers running partition operations.
    pub worker_count: usize,
    /// Pending jobs the execution queue holds; submitters wait for room beyond that.
    pub queue_capacity: usize,
    /// Bound on each partition wait during gather. Absent means wait forever.
    pub gather_timeout_ms: Option<u64>,
    pub failure_policy: FailurePolicy,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            member_address: CallerAddress::new("127.0.0.1:5701"),
            worker_count: 4,
            queue_capacity: 1024,
            gather_timeout_ms: None,
            failure_policy: FailurePolicy::Degrade,
        }
    }
}

impl NodeConfig {
    pub fn gather_timeout(&self) -> Option<Duration> {
        self.gather_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid("worker_count must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be at least 1".into()));
        }
        if self.gather_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "gather_timeout_ms must be positive; omit it to wait forever".into(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    /// Apply `GRID_WORKERS` and `GRID_GATHER_TIMEOUT_MS` overrides from `lookup`.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("GRID_WORKERS") {
            self.worker_count = value.trim().parse().map_err(|_| ConfigError::Env {
                var: "GRID_WORKERS".into(),
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup("GRID_GATHER_TIMEOUT_MS") {
            self.gather_timeout_ms = Some(value.trim().parse().map_err(|_| ConfigError::Env {
                var: "GRID_GATHER_TIMEOUT_MS".into(),
                value: value.clone(),
            })?);
        }
        Ok(self)
    }

    /// Load from the resolved config file (or defaults), apply environment
    /// overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match resolve_config_path() {
            Some(path) => {
                tracing::info!("Loading node config from {}", path.display());
                Self::load_from_path(&path)?
            }
            None => Self::default(),
        };

        let config = config.apply_overrides(|var| env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }
}

/// Find the config file: `GRID_CONFIG`, then `$XDG_CONFIG_HOME/grid-scatter/config.json`,
/// then `./grid-scatter.json`.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(p) = env::var("GRID_CONFIG") {
        return Some(PathBuf::from(p));
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let candidate = PathBuf::from(xdg).join("grid-scatter").join("config.json");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let candidate = PathBuf::from("grid-scatter.json");
    if candidate.exists() {
        return Some(candidate);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = NodeConfig::default();
        config.validate().unwrap();
        assert_eq!(config.gather_timeout(), None);
        assert_eq!(config.failure_policy, FailurePolicy::Degrade);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            NodeConfig::from_json_str(r#"{"worker_count": 8, "failure_policy": "fail_fast"}"#)
                .unwrap();
        assert_eq!(config.worker_count, 8);
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            NodeConfig::from_json_str(r#"{"worker_count": "many"}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"member_address": "10.0.0.9:5701", "gather_timeout_ms": 250}}"#
        )
        .unwrap();

        let config = NodeConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.member_address.as_str(), "10.0.0.9:5701");
        assert_eq!(config.gather_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = NodeConfig::load_from_path(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> =
            HashMap::from([("GRID_WORKERS", "16"), ("GRID_GATHER_TIMEOUT_MS", " 500 ")]);
        let config = NodeConfig::default()
            .apply_overrides(|var| vars.get(var).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.worker_count, 16);
        assert_eq!(config.gather_timeout_ms, Some(500));
    }

    #[test]
    fn test_bad_override() {
        let err = NodeConfig::default()
            .apply_overrides(|var| (var == "GRID_WORKERS").then(|| "lots".to_string()))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Env {
                var: "GRID_WORKERS".into(),
                value: "lots".into()
            }
        );
    }

    #[test]
    fn test_validation() {
        let config = NodeConfig {
            worker_count: 0,
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());

        let config = NodeConfig {
            gather_timeout_ms: Some(0),
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
