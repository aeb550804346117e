//! CLI configuration: optional TOML file, then environment, then flags.
//!
//! ```toml
//! [gateway]
//! base_url = "http://localhost:4000"
//! request_timeout_secs = 120
//!
//! [council]
//! min_successful_responses = 2
//! max_concurrent_members = 4
//!
//! [defaults]
//! members = ["gpt-4o", "claude-sonnet", "llama3.2:3b"]
//! chairman = "gpt-4o"
//! store_path = "decisions.json"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use council_core::CouncilConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENV_PROXY_URL: &str = "LITELLM_PROXY_URL";
const ENV_API_KEY: &str = "LITELLM_API_KEY";
const ENV_MEMBERS: &str = "COUNCIL_MEMBERS";
const ENV_CHAIRMAN: &str = "COUNCIL_CHAIRMAN";
const ENV_STORE_PATH: &str = "COUNCIL_STORE_PATH";

const DEFAULT_BASE_URL: &str = "http://localhost:4000";
const DEFAULT_STORE_PATH: &str = "llm-council-decisions.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// OpenAI-compatible gateway (LiteLLM proxy) connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Sent as a bearer token when set.
    pub api_key: Option<String>,
    /// Longest wait for the next read of a response. A stream that keeps
    /// delivering chunks is never cut off.
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            request_timeout_secs: 120,
            connect_timeout_secs: 10,
        }
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// `base_url` without trailing slashes.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base())
    }

    pub fn models_url(&self) -> String {
        format!("{}/models", self.base())
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!(
                "gateway base_url must start with http:// or https://, got {:?}",
                self.base_url
            ));
        }
        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err("gateway timeouts must be > 0".to_string());
        }
        Ok(())
    }
}

/// Council used when the command line names none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub members: Vec<String>,
    pub chairman: Option<String>,
    pub store_path: Option<PathBuf>,
}

/// Everything the binary needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub gateway: GatewayConfig,
    pub council: CouncilConfig,
    pub defaults: DefaultsConfig,
}

impl CliConfig {
    /// Read `path` if given, then overlay the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok());
        config.council.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay gateway and default-council variables read through `lookup`.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_PROXY_URL).filter(|v| !v.trim().is_empty()) {
            self.gateway.base_url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.gateway.api_key = Some(key);
        }
        if let Some(members) = lookup(ENV_MEMBERS) {
            let members = split_members(&members);
            if !members.is_empty() {
                self.defaults.members = members;
            }
        }
        if let Some(chairman) = lookup(ENV_CHAIRMAN).filter(|v| !v.trim().is_empty()) {
            self.defaults.chairman = Some(chairman);
        }
        if let Some(path) = lookup(ENV_STORE_PATH).filter(|v| !v.trim().is_empty()) {
            self.defaults.store_path = Some(PathBuf::from(path));
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.defaults
            .store_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.validate().map_err(ConfigError::Invalid)?;
        self.council.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}

/// Comma-separated model ids, blanks dropped.
pub fn split_members(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_gateway_conventions() {
        let config = CliConfig::default();
        assert_eq!(config.gateway.base_url, "http://localhost:4000");
        assert_eq!(config.gateway.request_timeout(), Duration::from_secs(120));
        assert_eq!(config.gateway.connect_timeout(), Duration::from_secs(10));
        assert!(config.gateway.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn urls_drop_trailing_slash() {
        let gateway = GatewayConfig {
            base_url: "http://proxy:4000/".into(),
            ..Default::default()
        };
        assert_eq!(gateway.completions_url(), "http://proxy:4000/chat/completions");
        assert_eq!(gateway.models_url(), "http://proxy:4000/models");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: CliConfig = toml::from_str(
            r#"
            [council]
            max_concurrent_members = 3

            [defaults]
            members = ["a", "b"]
            chairman = "c"
            "#,
        )
        .unwrap();
        assert_eq!(config.council.max_concurrent_members, Some(3));
        assert_eq!(config.council.min_successful_responses, 2);
        assert_eq!(config.gateway, GatewayConfig::default());
        assert_eq!(config.defaults.members, vec!["a", "b"]);
        assert_eq!(config.defaults.chairman.as_deref(), Some("c"));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = CliConfig {
            defaults: DefaultsConfig {
                members: vec!["file-a".into(), "file-b".into()],
                ..Default::default()
            },
            ..Default::default()
        };
        let env: HashMap<&str, &str> = [
            ("LITELLM_PROXY_URL", "https://gateway.internal"),
            ("LITELLM_API_KEY", "sk-test"),
            ("COUNCIL_MEMBERS", "x, y ,,z"),
            ("COUNCIL_STORE_PATH", "/tmp/decisions.json"),
        ]
        .into_iter()
        .collect();
        config.apply_env_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.gateway.base_url, "https://gateway.internal");
        assert_eq!(config.gateway.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.defaults.members, vec!["x", "y", "z"]);
        assert!(config.defaults.chairman.is_none());
        assert_eq!(config.store_path(), PathBuf::from("/tmp/decisions.json"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = CliConfig::default();
        config.apply_env_from(|_| Some(String::new()));
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn bad_url_rejected() {
        let config = CliConfig {
            gateway: GatewayConfig {
                base_url: "localhost:4000".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = CliConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
