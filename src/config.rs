//! Configuration: geometry constants and orchestrator limits.
//!
//! Every field has a default, so a partial document (or none at all) is valid.
//! [`parse_config`] accepts YAML, JSON or TOML text.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(String),
}

/// Fixed geometry of container blocks (loop, parallel, subflow).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerGeometry {
    pub header_height: f64,
    pub left_padding: f64,
    pub top_padding: f64,
    pub right_padding: f64,
    pub bottom_padding: f64,
    pub min_width: f64,
    pub min_height: f64,
    pub default_width: f64,
    pub default_height: f64,
}

impl Default for ContainerGeometry {
    fn default() -> Self {
        ContainerGeometry {
            header_height: 50.0,
            left_padding: 16.0,
            top_padding: 16.0,
            right_padding: 80.0,
            bottom_padding: 16.0,
            min_width: 400.0,
            min_height: 200.0,
            default_width: 500.0,
            default_height: 300.0,
        }
    }
}

impl ContainerGeometry {
    /// Offset from a container's outer top-left to its content origin.
    pub fn content_offset_x(&self) -> f64 {
        self.left_padding
    }

    pub fn content_offset_y(&self) -> f64 {
        self.header_height + self.top_padding
    }
}

/// Estimation constants for ordinary blocks that have not been measured yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockGeometry {
    pub width: f64,
    pub header_height: f64,
    pub content_padding: f64,
    pub row_height: f64,
    pub min_rows: usize,
    pub max_rows: usize,
}

impl Default for BlockGeometry {
    fn default() -> Self {
        BlockGeometry {
            width: 250.0,
            header_height: 40.0,
            content_padding: 16.0,
            row_height: 29.0,
            min_rows: 3,
            max_rows: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub container: ContainerGeometry,
    pub block: BlockGeometry,
    /// Hop limit for every parent-chain walk.
    pub max_depth: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            container: ContainerGeometry::default(),
            block: BlockGeometry::default(),
            max_depth: 100,
        }
    }
}

/// Backoff used when the engine rejects a run start as rate limited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn disabled() -> Self {
        RetryPolicy {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (0-based), with ±25% jitter.
    ///
    /// An engine-supplied `retry_after_ms` replaces the computed backoff.
    pub fn delay_ms(&self, attempt: u32, retry_after_ms: Option<u64>) -> u64 {
        if let Some(retry_after) = retry_after_ms {
            return retry_after;
        }
        let base = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay_ms as f64);
        let jitter = 0.75 + rand::random::<f64>() * 0.5;
        (capped * jitter) as u64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Upper bound on continuation calls made by a single resume.
    pub max_resume_iterations: usize,
    pub retry: RetryPolicy,
    /// Separator inserted before the first streamed chunk of every block but
    /// the first.
    pub stream_separator: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            max_resume_iterations: 500,
            retry: RetryPolicy::default(),
            stream_separator: "\n\n".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub layout: LayoutConfig,
    pub execution: OrchestratorConfig,
}

/// Supported configuration formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    /// Format implied by a file extension (`.yaml`/`.yml`, `.json`, `.toml`).
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            "toml" => Some(ConfigFormat::Toml),
            _ => None,
        }
    }
}

/// Parse configuration text into a [`CanvasConfig`].
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<CanvasConfig, ConfigError> {
    match format {
        ConfigFormat::Yaml => {
            serde_saphyr::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
        ConfigFormat::Toml => {
            let toml_val: toml::Value =
                toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
            serde_json::from_value(toml_value_to_json(toml_val))
                .map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }
}

fn toml_value_to_json(val: toml::Value) -> serde_json::Value {
    match val {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_value_to_json).collect())
        }
        toml::Value::Table(tbl) => serde_json::Value::Object(
            tbl.into_iter()
                .map(|(k, v)| (k, toml_value_to_json(v)))
                .collect(),
        ),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_partial() {
        let yaml = r#"
layout:
  container:
    header_height: 60.0
execution:
  max_resume_iterations: 10
"#;
        let config = parse_config(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.layout.container.header_height, 60.0);
        assert_eq!(config.layout.container.left_padding, 16.0);
        assert_eq!(config.layout.max_depth, 100);
        assert_eq!(config.execution.max_resume_iterations, 10);
        assert_eq!(config.execution.retry.max_retries, 3);
    }

    #[test]
    fn test_parse_json_empty_uses_defaults() {
        let config = parse_config("{}", ConfigFormat::Json).unwrap();
        assert_eq!(config, CanvasConfig::default());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[layout.block]
row_height = 30.0

[execution.retry]
max_retries = 0
"#;
        let config = parse_config(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.layout.block.row_height, 30.0);
        assert_eq!(config.execution.retry.max_retries, 0);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path("canvas.yml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path("conf/canvas.YAML"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path("canvas.json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_path("canvas.toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_path("canvas.ini"), None);
        assert_eq!(ConfigFormat::from_path("canvas"), None);
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_config("{not json", ConfigFormat::Json).unwrap_err();
        assert!(err.to_string().starts_with("Config parse error"));
    }

    #[test]
    fn test_retry_delay_honours_retry_after() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_ms(2, Some(1234)), 1234);
    }

    #[test]
    fn test_retry_delay_jitter_bounds() {
        let policy = RetryPolicy::default();
        for attempt in 0..8 {
            let delay = policy.delay_ms(attempt, None);
            let base = (1000.0 * 2f64.powi(attempt as i32)).min(30_000.0);
            assert!(delay as f64 >= base * 0.75 - 1.0);
            assert!(delay as f64 <= base * 1.25);
        }
    }
}
