//! Runtime configuration for the debate engine.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Environment variable overrides (`COUNCIL_*`) via [`CouncilConfig::from_env`]
//! 2. Values set on the struct
//! 3. Built-in defaults

use std::env;

use serde::{Deserialize, Serialize};

/// Fewest successful council responses that still allow synthesis.
pub const MIN_RESPONSES_FOR_SYNTHESIS: usize = 2;
/// Sampling temperature for council members.
const DEFAULT_COUNCIL_TEMPERATURE: f32 = 0.7;
/// Lower temperature for the chairman so the section layout stays literal.
const DEFAULT_CHAIRMAN_TEMPERATURE: f32 = 0.3;

const ENV_MIN_RESPONSES: &str = "COUNCIL_MIN_RESPONSES";
const ENV_MAX_CONCURRENT: &str = "COUNCIL_MAX_CONCURRENT";
const ENV_COUNCIL_TEMPERATURE: &str = "COUNCIL_TEMPERATURE";
const ENV_CHAIRMAN_TEMPERATURE: &str = "COUNCIL_CHAIRMAN_TEMPERATURE";
const ENV_MAX_TOKENS: &str = "COUNCIL_MAX_TOKENS";

/// Policy knobs consumed by the collector, synthesis driver, and session manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouncilConfig {
    /// Partial-failure threshold. Never below [`MIN_RESPONSES_FOR_SYNTHESIS`].
    pub min_successful_responses: usize,
    /// Cap on simultaneously streaming members. `None` runs everyone at once.
    pub max_concurrent_members: Option<usize>,
    pub council_temperature: f32,
    pub chairman_temperature: f32,
    /// Per-call output limit forwarded to the producer.
    pub max_tokens: Option<u32>,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            min_successful_responses: MIN_RESPONSES_FOR_SYNTHESIS,
            max_concurrent_members: None,
            council_temperature: DEFAULT_COUNCIL_TEMPERATURE,
            chairman_temperature: DEFAULT_CHAIRMAN_TEMPERATURE,
            max_tokens: None,
        }
    }
}

impl CouncilConfig {
    /// Defaults overlaid with any `COUNCIL_*` environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay `COUNCIL_*` environment variables onto the current values.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_parse::<usize>(ENV_MIN_RESPONSES) {
            self.min_successful_responses = v;
        }
        if let Some(v) = env_parse::<usize>(ENV_MAX_CONCURRENT) {
            self.max_concurrent_members = Some(v);
        }
        if let Some(v) = env_parse::<f32>(ENV_COUNCIL_TEMPERATURE) {
            self.council_temperature = v;
        }
        if let Some(v) = env_parse::<f32>(ENV_CHAIRMAN_TEMPERATURE) {
            self.chairman_temperature = v;
        }
        if let Some(v) = env_parse::<u32>(ENV_MAX_TOKENS) {
            self.max_tokens = Some(v);
        }
    }

    /// Validate the config; return an error string if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_successful_responses < MIN_RESPONSES_FOR_SYNTHESIS {
            return Err(format!(
                "min_successful_responses must be >= {}, got {}",
                MIN_RESPONSES_FOR_SYNTHESIS, self.min_successful_responses
            ));
        }
        if self.max_concurrent_members == Some(0) {
            return Err("max_concurrent_members must be > 0 when set".to_string());
        }
        for (name, value) in [
            ("council_temperature", self.council_temperature),
            ("chairman_temperature", self.chairman_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(format!("{name} must be in [0, 2], got {value}"));
            }
        }
        if self.max_tokens == Some(0) {
            return Err("max_tokens must be > 0 when set".to_string());
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}
