use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::topic::{Example, Topic, slugify};
use crate::output::OutputFormat;
use crate::types::ResourceLimits;

pub mod topic;
mod loader;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../snipbox.example.toml");

/// Tag prepended to every failure message unless configured otherwise
pub const DEFAULT_ERROR_TAG: &str = "Error: ";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("topic '{0}' not found in configuration")]
    TopicNotFound(String),

    #[error("example '{example}' not found in topic '{topic}'")]
    ExampleNotFound { topic: String, example: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for Snipbox
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Budget applied to every run
    #[serde(default)]
    pub limits: ResourceLimits,

    /// How output and failures are presented
    #[serde(default)]
    pub output: OutputConfig,

    /// Topic catalog keyed by topic ID
    #[serde(default)]
    pub topics: BTreeMap<String, Topic>,
}

/// Rendering and environment settings for the sandbox
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Prefix of every failure message
    #[serde(default = "default_error_tag")]
    pub error_tag: String,

    /// Make reads of unbound globals fail instead of yielding nil
    #[serde(default = "default_strict_globals")]
    pub strict_globals: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            error_tag: default_error_tag(),
            strict_globals: default_strict_globals(),
        }
    }
}

impl Config {
    /// Create a new config with the embedded topic catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with no topics
    pub fn empty() -> Self {
        Self {
            limits: ResourceLimits::default(),
            output: OutputConfig::default(),
            topics: BTreeMap::new(),
        }
    }

    /// Get a topic by ID
    pub fn get_topic(&self, id: &str) -> Result<&Topic, ConfigError> {
        self.topics
            .get(id)
            .ok_or_else(|| ConfigError::TopicNotFound(id.to_string()))
    }

    /// Get an example of a topic by name or slug
    pub fn get_example(&self, topic: &str, example: &str) -> Result<&Example, ConfigError> {
        self.get_topic(topic)?
            .example(example)
            .ok_or_else(|| ConfigError::ExampleNotFound {
                topic: topic.to_string(),
                example: example.to_string(),
            })
    }

    /// Limits for a run: built-in defaults → configured limits → overrides
    pub fn effective_limits(&self, overrides: Option<&ResourceLimits>) -> ResourceLimits {
        let base = ResourceLimits::default().with_overrides(&self.limits);
        match overrides {
            Some(limits) => base.with_overrides(limits),
            None => base,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_error_tag() -> String {
    DEFAULT_ERROR_TAG.to_owned()
}

fn default_strict_globals() -> bool {
    true
}
