use std::collections::BTreeMap;
use std::path::Path;

use jsonschema::{validator_for, Validator};
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid toml: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config does not match schema: {}", .0.join(", "))]
    Schema(Vec<String>),
    #[error("failed to convert config: {0}")]
    Convert(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Admin API base URL, e.g. <http://127.0.0.1:8091>
    #[serde(default)]
    pub base_url: Option<String>,
    /// Bearer token sent with every admin request.
    #[serde(default)]
    pub admin_token: Option<String>,
    #[serde(default)]
    #[schemars(range(min = 1))]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    #[schemars(range(min = 1))]
    pub connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    /// Background refresh period; 0 disables polling.
    #[serde(default)]
    pub default_interval_ms: Option<u64>,
    /// Lower bound applied to every non-zero interval.
    #[serde(default)]
    pub min_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    #[serde(default)]
    pub interval_ms: Option<u64>,
    /// Query parameters appended to the resource request.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub poll: PollConfig,
    /// Per-resource overrides keyed by resource name (`http`, `llm`, ...).
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceConfig>,
}

static CONFIG_SCHEMA: Lazy<Validator> = Lazy::new(|| {
    validator_for(&config_schema_json()).expect("valid schema")
});

/// Returns the JSON schema describing the configuration structure.
///
/// # Panics
///
/// Panics if schema generation fails; this indicates a programming error.
pub fn config_schema_json() -> serde_json::Value {
    let schema = schemars::schema_for!(Config);
    serde_json::to_value(&schema).expect("schema json")
}

pub fn write_schema_file(path: impl AsRef<Path>) -> std::io::Result<()> {
    let schema_json = config_schema_json();
    std::fs::write(path, serde_json::to_string_pretty(&schema_json)?)
}

/// Parses and validates a TOML document.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let raw: toml::Table = toml::from_str(content)?;
    let json_value = serde_json::to_value(&raw)?;
    let validation_errors: Vec<_> = CONFIG_SCHEMA
        .iter_errors(&json_value)
        .map(|e| e.to_string())
        .collect();
    if !validation_errors.is_empty() {
        return Err(ConfigError::Schema(validation_errors));
    }
    Ok(serde_json::from_value(json_value)?)
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&content)
}
