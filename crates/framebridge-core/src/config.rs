//! Pipeline configuration: mapping rules, endpoints, retry policy.
//!
//! All structs deserialize from TOML with serde defaults so a minimal file
//! stays minimal. [`BridgeConfig::validate`] runs the load-time checks the
//! rest of the pipeline relies on (closed enums are enforced during
//! deserialization already).

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rule::Rule;
use crate::value::FieldType;

/// Configuration entry describing how one parsed field becomes one outbound
/// payload field. List order defines per-field processing order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRule {
    /// Field name in the parsed record.
    pub source_field: String,
    /// Key written into the outbound payload.
    pub target_field: String,
    /// Declared type of the outbound value.
    pub target_type: FieldType,
    /// Optional registered converter applied before coercion.
    #[serde(default)]
    pub converter: Option<String>,
    /// Optional default written when a required field fails to convert.
    /// Reserved words are expanded before coercion.
    #[serde(default)]
    pub default_value: Option<String>,
    /// Required targets are written with a default on failure; optional
    /// targets are omitted instead.
    #[serde(default)]
    pub required: bool,
}

/// One outbound HTTP endpoint with its ordered mapping rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Endpoint name referenced by `map_to_outbound`.
    pub name: String,
    /// Target URL (consumed by the delivery collaborator).
    pub url: String,
    /// HTTP method hint.
    #[serde(default = "default_method")]
    pub method: String,
    /// Content type hint.
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// Outbound message priority.
    #[serde(default)]
    pub priority: i32,
    /// Ordered mapping rules for this endpoint.
    #[serde(default)]
    pub mapping_rules: Vec<MappingRule>,
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_content_type() -> String {
    "application/json".to_string()
}

/// Retry variant selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetryMode {
    /// Exactly one attempt, any failure is terminal.
    None,
    /// Constant delay between attempts.
    Fixed,
    /// Exponentially growing delay, capped at `max_delay_ms`.
    #[default]
    Exponential,
}

/// Governs attempt count and inter-attempt delay for delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Application-level status codes treated as retryable failures.
    #[serde(default = "default_retryable_status_codes")]
    pub retryable_status_codes: HashSet<u16>,
    /// Retry on network (connect/reset) failures.
    #[serde(default = "default_true")]
    pub retry_on_network: bool,
    /// Retry on timeout failures.
    #[serde(default = "default_true")]
    pub retry_on_timeout: bool,
    #[serde(default)]
    pub mode: RetryMode,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_retryable_status_codes() -> HashSet<u16> {
    [408, 429, 500, 502, 503, 504].into_iter().collect()
}

fn default_true() -> bool {
    true
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            retryable_status_codes: default_retryable_status_codes(),
            retry_on_network: true,
            retry_on_timeout: true,
            mode: RetryMode::default(),
        }
    }
}

impl RetryPolicyConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Device identity used by `@deviceId` templating.
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
    #[serde(default)]
    pub retry: RetryPolicyConfig,
}

impl BridgeConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load-time structural validation.
    ///
    /// Unknown format tags and field types never get this far; they are
    /// rejected while deserializing the closed enums.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            rule.validate()?;
            if !seen.insert(rule.name.as_str()) {
                return Err(ConfigError::DuplicateRule(rule.name.clone()));
            }
        }

        let mut endpoint_names = HashSet::new();
        for endpoint in &self.endpoints {
            if endpoint.name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "endpoint name is empty".to_string(),
                ));
            }
            if !endpoint_names.insert(endpoint.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate endpoint name: {}",
                    endpoint.name
                )));
            }
            for mapping in &endpoint.mapping_rules {
                if mapping.source_field.trim().is_empty()
                    || mapping.target_field.trim().is_empty()
                {
                    return Err(ConfigError::Validation(format!(
                        "endpoint '{}' has a mapping rule with an empty field name",
                        endpoint.name
                    )));
                }
            }
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
