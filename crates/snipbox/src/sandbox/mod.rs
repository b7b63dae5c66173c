//! Execution sandbox
//!
//! Every call to [`Sandbox::execute`] builds a new interpreter, compiles the
//! source against a restricted environment (see [`env`]) and runs it on the
//! calling thread under a [`Budget`]. Output is all-or-nothing: lines printed
//! before a failure are discarded.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use mlua::{Lua, LuaOptions};
use tracing::{debug, instrument, warn};

pub use crate::sandbox::budget::{Breach, Budget, HOOK_INTERVAL, Meter};
pub use crate::sandbox::classify::{classify, split_location};
pub use crate::sandbox::env::sandbox_libs;

mod budget;
mod classify;
mod env;
mod patterns;

use crate::config::{Config, OutputConfig};
use crate::output::OutputSink;
use crate::types::{Execution, ExecutionResult, Failure, FailureKind, ResourceLimits, RunStats};

/// Name the snippet chunk reports in error positions
pub const CHUNK_NAME: &str = "=snippet";

/// Runs snippets. Holds configuration only, so it is cheap to clone and can
/// be shared between threads; all interpreter state lives inside one call.
#[derive(Debug, Clone)]
pub struct Sandbox {
    limits: ResourceLimits,
    output: OutputConfig,
}

impl Sandbox {
    /// Create a sandbox from the configured limits and output settings
    pub fn new(config: &Config) -> Self {
        Self {
            limits: config.effective_limits(None),
            output: config.output.clone(),
        }
    }

    /// Create a sandbox with the built-in defaults
    pub fn with_defaults() -> Self {
        Self {
            limits: ResourceLimits::default(),
            output: OutputConfig::default(),
        }
    }

    /// Replace the limits of this sandbox
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Replace the output settings of this sandbox
    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    pub fn output_config(&self) -> &OutputConfig {
        &self.output
    }

    /// Compile and run `source`, producing exactly one result
    #[instrument(skip_all, fields(source_len = source.len()))]
    pub fn execute(&self, source: &str) -> Execution {
        let started = Instant::now();
        let tag = self.output.error_tag.as_str();

        if let Some(max) = self.limits.max_source_bytes
            && source.len() > max
        {
            let description = format!("source is {} bytes, limit is {max}", source.len());
            debug!(%description, "snippet rejected");
            return Execution {
                result: ExecutionResult::Failure(Failure::new(
                    FailureKind::Rejected,
                    tag,
                    &description,
                    None,
                )),
                stats: RunStats {
                    wall_time: started.elapsed(),
                    ..Default::default()
                },
            };
        }

        let sink = Rc::new(RefCell::new(
            OutputSink::new(self.output.format).with_max_lines(self.limits.max_output_lines),
        ));
        let budget = Budget::new(&self.limits);

        let (outcome, memory) = match Lua::new_with(sandbox_libs(), LuaOptions::new()) {
            Ok(lua) => {
                let outcome = self.run_chunk(&lua, source, &sink, &budget);
                (outcome, lua.used_memory())
            }
            Err(err) => (Err(err), 0),
        };

        let output_lines = sink.borrow().len();
        let result = match outcome {
            Ok(()) => match budget.breach() {
                // A breach swallowed by the snippet still fails the run
                Some(breach) => ExecutionResult::Failure(Failure::new(
                    breach.kind(),
                    tag,
                    &breach.to_string(),
                    None,
                )),
                None => ExecutionResult::Success {
                    output: sink.borrow().join(),
                },
            },
            Err(err) => ExecutionResult::Failure(classify(&err, budget.breach(), tag)),
        };

        let stats = RunStats {
            wall_time: started.elapsed(),
            memory,
            output_lines,
        };

        match &result {
            ExecutionResult::Success { .. } => {
                debug!(lines = output_lines, elapsed = ?stats.wall_time, "snippet succeeded")
            }
            ExecutionResult::Failure(failure) if failure.kind.is_limit() => {
                warn!(
                    kind = %failure.kind,
                    message = %failure.message,
                    elapsed = ?stats.wall_time,
                    "snippet stopped at its budget"
                )
            }
            ExecutionResult::Failure(failure) => {
                debug!(
                    kind = %failure.kind,
                    line = ?failure.line,
                    elapsed = ?stats.wall_time,
                    "snippet failed"
                )
            }
        }

        Execution { result, stats }
    }

    fn run_chunk(
        &self,
        lua: &Lua,
        source: &str,
        sink: &Rc<RefCell<OutputSink>>,
        budget: &Budget,
    ) -> mlua::Result<()> {
        if let Some(limit) = self.limits.memory_limit {
            lua.set_memory_limit(limit)?;
        }

        let environment = env::build(lua, Rc::clone(sink), budget.meter(), &self.output)?;
        let chunk = lua
            .load(source)
            .set_name(CHUNK_NAME)
            .set_environment(environment.table)
            .into_function()?;

        budget.install(lua);
        environment.run.call::<_, ()>(chunk)
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::with_defaults()
    }
}
