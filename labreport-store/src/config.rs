use std::env;
use std::time::Duration;

use labreport_core::LabError;
use serde::{Deserialize, Serialize};

pub const API_URL_VAR: &str = "LABREPORT_API_URL";
pub const TIMEOUT_VAR: &str = "LABREPORT_TIMEOUT_SECS";
pub const REFRESH_VAR: &str = "LABREPORT_REFRESH_SECS";

/// Where the data store lives and how patiently to talk to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Period of the background list refresh.
    pub refresh_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_secs: 30,
            refresh_interval_secs: 30,
        }
    }
}

impl StoreConfig {
    /// Defaults overlaid with the `LABREPORT_*` environment variables.
    pub fn from_env() -> Result<Self, LabError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LabError> {
        let mut config = Self::default();
        if let Some(url) = lookup(API_URL_VAR).filter(|url| !url.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(TIMEOUT_VAR) {
            config.timeout_secs = parse_secs(TIMEOUT_VAR, &raw)?;
        }
        if let Some(raw) = lookup(REFRESH_VAR) {
            config.refresh_interval_secs = parse_secs(REFRESH_VAR, &raw)?;
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

fn parse_secs(name: &str, raw: &str) -> Result<u64, LabError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| {
            LabError::Validation(format!(
                "{name} must be a whole number of seconds, got {raw:?}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_defaults() {
        let config = StoreConfig::from_lookup(|key| match key {
            API_URL_VAR => Some(" http://lab.internal:8080 ".to_string()),
            REFRESH_VAR => Some("5".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.base_url, "http://lab.internal:8080");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.refresh_interval(), Duration::from_secs(5));
    }

    #[test]
    fn malformed_number_is_rejected() {
        let err = StoreConfig::from_lookup(|key| (key == TIMEOUT_VAR).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));
    }

    #[test]
    fn zero_refresh_is_clamped() {
        let config = StoreConfig {
            refresh_interval_secs: 0,
            ..StoreConfig::default()
        };
        assert_eq!(config.refresh_interval(), Duration::from_secs(1));
    }
}
