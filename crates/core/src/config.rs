//! Tree configuration
//!
//! A [`TreeConfig`] is usually loaded from a TOML file. Every field has a
//! default, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_UNIT_URL: &str = "https://localhost/";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("invalid unit url: {0}")]
    UnitUrl(#[from] url::ParseError),
}

/// How metadata loads are retried when the sidecar cannot be read or decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Pause between attempts in milliseconds
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps, for tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff_ms: 0,
        }
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Configuration for a resource tree rooted at a local directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Directory holding one subdirectory per cell
    pub root: PathBuf,
    /// Base url of the unit, cells live directly below it
    pub unit_url: String,
    /// Maximum number of collection hops below a box root
    pub max_collection_depth: usize,
    /// Maximum number of children a collection may hold
    pub max_child_resource_count: usize,
    /// Call `sync_all` after writing metadata and content
    pub fsync: bool,
    pub retry: RetryPolicy,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("cells"),
            unit_url: DEFAULT_UNIT_URL.to_string(),
            max_collection_depth: 5,
            max_child_resource_count: 1000,
            fsync: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl TreeConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn with_unit_url(mut self, unit_url: impl Into<String>) -> Self {
        self.unit_url = unit_url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw)?;
        config.unit()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, raw).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Unit url, always with a trailing slash so cell names join below it
    pub fn unit(&self) -> Result<url::Url, url::ParseError> {
        if self.unit_url.ends_with('/') {
            url::Url::parse(&self.unit_url)
        } else {
            url::Url::parse(&format!("{}/", self.unit_url))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: TreeConfig = toml::from_str("").unwrap();
        assert_eq!(config, TreeConfig::default());
        assert_eq!(config.max_collection_depth, 5);
        assert_eq!(config.max_child_resource_count, 1000);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff(), Duration::from_millis(100));
        assert!(!config.fsync);
    }

    #[test]
    fn test_partial_toml() {
        let raw = r#"
            root = "/srv/cells"
            fsync = true

            [retry]
            max_attempts = 2
        "#;
        let config: TreeConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.root, PathBuf::from("/srv/cells"));
        assert!(config.fsync);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.backoff_ms, 100);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = TreeConfig::new("/tmp/cells").with_unit_url("https://unit.example");
        config.save(&path).unwrap();

        let loaded = TreeConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.unit().unwrap().as_str(), "https://unit.example/");
    }

    #[test]
    fn test_load_rejects_bad_unit_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "unit_url = \"not a url\"").unwrap();
        assert!(matches!(
            TreeConfig::load(&path),
            Err(ConfigError::UnitUrl(_))
        ));
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::immediate(0).attempts(), 1);
    }
}
