use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Settings for the outbound HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// No timeout when unset.
    pub request_timeout_secs: Option<u64>,
    pub user_agent: String,
    pub accept_invalid_certs: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: None,
            user_agent: format!("formkit/{}", env!("CARGO_PKG_VERSION")),
            accept_invalid_certs: false,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON config; blank input yields the defaults.
    pub fn from_json_str(config_json: &str) -> Result<Self, EngineError> {
        if config_json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(config_json).map_err(EngineError::ConfigParse)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_config_uses_defaults() {
        let config = EngineConfig::from_json_str("  ").expect("defaults");
        assert_eq!(config, EngineConfig::default());
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config = EngineConfig::from_json_str(r#"{"requestTimeoutSecs": 5}"#).expect("valid");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(5)));
        assert!(config.user_agent.starts_with("formkit/"));
        assert!(EngineConfig::from_json_str("{").is_err());
    }
}
