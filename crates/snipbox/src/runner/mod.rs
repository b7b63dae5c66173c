//! Async runner for Snipbox
//!
//! Moves snippet runs onto tokio's blocking pool. The interpreter's own
//! budget ends runaway snippets, so a run never has to be cancelled from
//! the async side.

use thiserror::Error;
use tracing::{debug, info};

use crate::{
    config::{Config, ConfigError},
    sandbox::Sandbox,
    types::{Execution, ResourceLimits},
};

/// Errors that occur while dispatching a run
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("run task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// High-level runner for snippet execution
#[derive(Debug, Clone)]
pub struct Runner {
    config: Config,
}

impl Runner {
    /// Create a new runner with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Create a new runner with default configuration
    pub fn with_defaults() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A sandbox using the configured limits, with optional overrides
    pub fn sandbox(&self, limits: Option<&ResourceLimits>) -> Sandbox {
        Sandbox::new(&self.config).with_limits(self.config.effective_limits(limits))
    }

    /// Run a snippet on the blocking pool
    pub async fn run(
        &self,
        source: String,
        limits: Option<&ResourceLimits>,
    ) -> Result<Execution, RunnerError> {
        let sandbox = self.sandbox(limits);
        debug!(bytes = source.len(), "dispatching run");

        let execution = tokio::task::spawn_blocking(move || sandbox.execute(&source)).await?;

        info!(
            success = execution.result.is_success(),
            wall_time = ?execution.stats.wall_time,
            memory = execution.stats.memory,
            lines = execution.stats.output_lines,
            "run finished"
        );
        Ok(execution)
    }

    /// Run a catalog example by topic ID and example name or slug
    pub async fn run_example(
        &self,
        topic: &str,
        example: &str,
        limits: Option<&ResourceLimits>,
    ) -> Result<Execution, RunnerError> {
        let code = self.config.get_example(topic, example)?.code.clone();
        self.run(code, limits).await
    }
}
