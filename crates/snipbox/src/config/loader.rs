//! Configuration file loading for Snipbox
//!
//! Handles loading and parsing configuration files using the config crate.

use std::collections::HashSet;
use std::path::Path;

use config::{Config as ConfigBuilder, File, FileFormat};

use crate::config::{Config, ConfigError};

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.output.error_tag.is_empty() {
            return Err(ConfigError::Invalid("output.error_tag is empty".to_string()));
        }

        let limits = &self.limits;
        let zero = [
            ("timeout_ms", limits.timeout_ms == Some(0)),
            ("instruction_limit", limits.instruction_limit == Some(0)),
            ("memory_limit", limits.memory_limit == Some(0)),
            ("max_output_lines", limits.max_output_lines == Some(0)),
            ("max_source_bytes", limits.max_source_bytes == Some(0)),
        ];
        if let Some((name, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
            return Err(ConfigError::Invalid(format!("limits.{name} must be positive")));
        }

        for (id, topic) in &self.topics {
            if topic.title.is_empty() {
                return Err(ConfigError::Invalid(format!("topic '{id}' has empty title")));
            }

            let mut slugs = HashSet::new();
            for example in &topic.examples {
                let slug = example.slug();
                if slug.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "topic '{id}' has an example with an empty name"
                    )));
                }
                if !slugs.insert(slug) {
                    return Err(ConfigError::Invalid(format!(
                        "topic '{id}' has duplicate example '{}'",
                        example.name
                    )));
                }
            }
        }

        Ok(())
    }
}
