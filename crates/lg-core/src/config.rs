//! Configuration types and parsing for lineage.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest accepted traversal depth
pub const MIN_TRAVERSAL_DEPTH: usize = 1;

/// Largest accepted traversal depth
pub const MAX_TRAVERSAL_DEPTH: usize = 50;

/// Traversal depth used when none is given
pub const DEFAULT_TRAVERSAL_DEPTH: usize = 10;

/// Project configuration from lineage.yml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional project name
    #[serde(default)]
    pub name: Option<String>,

    /// SQL dialect for parsing
    #[serde(default = "default_dialect")]
    pub dialect: String,

    /// Qualifiers applied to unqualified table names
    #[serde(default)]
    pub defaults: NameDefaults,

    #[serde(default)]
    pub traversal: TraversalConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NameDefaults {
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraversalConfig {
    /// Default depth for lineage queries
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

/// Graph store call settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Per-call timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retry: RetrySettings::default(),
        }
    }
}

/// Backoff settings for transient store failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Maximum statements analyzed and written at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Extra function names never reported as procedure calls
    #[serde(default)]
    pub builtin_functions: Vec<String>,
}

fn default_dialect() -> String {
    "generic".to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_TRAVERSAL_DEPTH
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    2_000
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_concurrency() -> usize {
    4
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: None,
            dialect: default_dialect(),
            defaults: NameDefaults::default(),
            traversal: TraversalConfig::default(),
            store: StoreConfig::default(),
            ingest: IngestConfig::default(),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        log::debug!("Loading config from {}", path.display());
        Self::from_yaml(&content)
    }

    /// Load configuration from a directory (looks for lineage.yml or lineage.yaml)
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("lineage.yml");
        let yaml_path = dir.join("lineage.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Parse and validate configuration text
    pub fn from_yaml(content: &str) -> CoreResult<Self> {
        // An empty file is a valid, all-defaults configuration
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config =
            serde_yaml::from_str(content).map_err(|e| CoreError::ConfigParseError {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |message: String| Err(CoreError::ConfigInvalid { message });

        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return invalid("Project name cannot be empty".to_string());
        }
        if self.dialect.trim().is_empty() {
            return invalid("dialect cannot be empty".to_string());
        }
        let depth = self.traversal.max_depth;
        if !(MIN_TRAVERSAL_DEPTH..=MAX_TRAVERSAL_DEPTH).contains(&depth) {
            return invalid(format!(
                "traversal.max_depth must be within [{}, {}], got {}",
                MIN_TRAVERSAL_DEPTH, MAX_TRAVERSAL_DEPTH, depth
            ));
        }
        if self.store.timeout_ms == 0 {
            return invalid("store.timeout_ms must be greater than 0".to_string());
        }
        let retry = &self.store.retry;
        if retry.max_attempts == 0 {
            return invalid("store.retry.max_attempts must be at least 1".to_string());
        }
        if retry.multiplier.is_nan() || retry.multiplier < 1.0 {
            return invalid(format!(
                "store.retry.multiplier must be >= 1.0, got {}",
                retry.multiplier
            ));
        }
        if retry.initial_delay_ms > retry.max_delay_ms {
            return invalid(format!(
                "store.retry.initial_delay_ms ({}) exceeds max_delay_ms ({})",
                retry.initial_delay_ms, retry.max_delay_ms
            ));
        }
        if self.ingest.concurrency == 0 {
            return invalid("ingest.concurrency must be at least 1".to_string());
        }
        if let Some(empty) = self
            .analyzer
            .builtin_functions
            .iter()
            .position(|f| f.trim().is_empty())
        {
            return invalid(format!(
                "analyzer.builtin_functions[{}] cannot be empty",
                empty
            ));
        }
        Ok(())
    }

    /// Default database, if configured
    pub fn default_database(&self) -> Option<&str> {
        self.defaults.database.as_deref()
    }

    /// Default schema, if configured
    pub fn default_schema(&self) -> Option<&str> {
        self.defaults.schema.as_deref()
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
