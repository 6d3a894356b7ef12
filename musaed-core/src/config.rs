use std::fs;
use std::path::Path;
use std::time::Duration;

use musaed_text::SimilarityStrategy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_ENV: &str = "MUSAED_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{name} must be within [0, 1], got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("{0} must not be blank")]
    Blank(&'static str),

    #[error("cache_ttl_secs must be at least 1; omit it to keep the cache until invalidated")]
    ZeroCacheTtl,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum score a learned answer must exceed to be served.
    pub learned_threshold: f64,
    /// Minimum similarity an operator-answered pending question must
    /// exceed. Stricter than the learned threshold since those answers are
    /// not yet vetted.
    pub pending_threshold: f64,
    pub similarity: SimilarityStrategy,
    /// When set, the learned-answer cache reloads after this many seconds
    /// even without an invalidation.
    pub cache_ttl_secs: Option<u64>,
    pub guest_name: String,
    pub anonymous_user_id: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            learned_threshold: 0.65,
            pending_threshold: 0.8,
            similarity: SimilarityStrategy::default(),
            cache_ttl_secs: None,
            guest_name: "Guest".into(),
            anonymous_user_id: "anonymous".into(),
        }
    }
}

impl EngineConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn from_env_or_default() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_path(path),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("learned_threshold", self.learned_threshold),
            ("pending_threshold", self.pending_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        if self.cache_ttl_secs == Some(0) {
            return Err(ConfigError::ZeroCacheTtl);
        }
        if self.guest_name.trim().is_empty() {
            return Err(ConfigError::Blank("guest_name"));
        }
        if self.anonymous_user_id.trim().is_empty() {
            return Err(ConfigError::Blank("anonymous_user_id"));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{"learned_threshold": 0.7, "similarity": "jaro-winkler"}"#).unwrap();

        let config = EngineConfig::from_path(&path).unwrap();
        assert_eq!(config.learned_threshold, 0.7);
        assert_eq!(config.pending_threshold, 0.8);
        assert_eq!(config.similarity, SimilarityStrategy::JaroWinkler);
        assert_eq!(config.guest_name, "Guest");
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{"pending_threshold": 1.5}"#).unwrap();

        let err = EngineConfig::from_path(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidThreshold { name: "pending_threshold", .. }
        ));
    }

    #[test]
    fn rejects_zero_cache_ttl() {
        let config = EngineConfig {
            cache_ttl_secs: Some(0),
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroCacheTtl)));
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        let config = EngineConfig {
            cache_ttl_secs: Some(30),
            ..EngineConfig::default()
        };
        config.to_path(&path).unwrap();
        assert_eq!(EngineConfig::from_path(&path).unwrap(), config);
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(30)));
    }
}
