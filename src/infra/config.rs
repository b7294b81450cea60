use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::analyzers::types::AverageSource;

/// Connection and session settings for the admission data provider.
///
/// Stored as a JSON object on disk; every field is optional:
/// ```json
/// {
///   "base_url": "http://127.0.0.1:5000",
///   "timeout_secs": 30,
///   "connect_timeout_secs": 10,
///   "max_concurrent_fetches": 5,
///   "average_source": "provider"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_concurrent_fetches: usize,
    pub average_source: AverageSource,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_concurrent_fetches: 5,
            average_source: AverageSource::Provider,
        }
    }
}

impl ProviderConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{path}'"))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config '{path}'"))?;
        Ok(config)
    }

    /// Applies `ADMISSION_*` overrides from the process environment.
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`. Unparsable values are errors.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup("ADMISSION_API_URL") {
            self.base_url = url;
        }
        if let Some(v) = lookup("ADMISSION_TIMEOUT_SECS") {
            self.timeout_secs = v
                .trim()
                .parse()
                .with_context(|| format!("ADMISSION_TIMEOUT_SECS='{v}'"))?;
        }
        if let Some(v) = lookup("ADMISSION_CONNECT_TIMEOUT_SECS") {
            self.connect_timeout_secs = v
                .trim()
                .parse()
                .with_context(|| format!("ADMISSION_CONNECT_TIMEOUT_SECS='{v}'"))?;
        }
        if let Some(v) = lookup("ADMISSION_MAX_CONCURRENT_FETCHES") {
            self.max_concurrent_fetches = v
                .trim()
                .parse()
                .with_context(|| format!("ADMISSION_MAX_CONCURRENT_FETCHES='{v}'"))?;
        }
        if let Some(v) = lookup("ADMISSION_AVERAGE_SOURCE") {
            self.average_source = match v.trim().to_ascii_lowercase().as_str() {
                "provider" => AverageSource::Provider,
                "computed" => AverageSource::Computed,
                other => anyhow::bail!("ADMISSION_AVERAGE_SOURCE must be 'provider' or 'computed', got '{other}'"),
            };
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Fetch concurrency, never below one.
    pub fn fetch_limit(&self) -> usize {
        self.max_concurrent_fetches.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ProviderConfig =
            serde_json::from_str(r#"{"base_url":"http://data.internal:8080"}"#).unwrap();
        assert_eq!(config.base_url, "http://data.internal:8080");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.average_source, AverageSource::Provider);
    }

    #[test]
    fn test_env_overrides() {
        let config = ProviderConfig::default()
            .with_overrides(lookup(&[
                ("ADMISSION_API_URL", "http://other:5000"),
                ("ADMISSION_MAX_CONCURRENT_FETCHES", " 12 "),
                ("ADMISSION_AVERAGE_SOURCE", "Computed"),
            ]))
            .unwrap();

        assert_eq!(config.base_url, "http://other:5000");
        assert_eq!(config.max_concurrent_fetches, 12);
        assert_eq!(config.average_source, AverageSource::Computed);
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn test_bad_override_is_an_error() {
        let result = ProviderConfig::default().with_overrides(lookup(&[("ADMISSION_TIMEOUT_SECS", "soon")]));
        assert!(result.is_err());

        let result = ProviderConfig::default().with_overrides(lookup(&[("ADMISSION_AVERAGE_SOURCE", "both")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_fetch_limit_floor() {
        let config = ProviderConfig {
            max_concurrent_fetches: 0,
            ..Default::default()
        };
        assert_eq!(config.fetch_limit(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("admission_cutoffs_test_config.json");
        std::fs::write(&path, r#"{"timeout_secs": 5, "average_source": "computed"}"#).unwrap();

        let config = ProviderConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.average_source, AverageSource::Computed);

        std::fs::remove_file(&path).unwrap();
    }
}
