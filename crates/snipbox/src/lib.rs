//! A library for running code snippets in a sandbox.
//!
//! Snipbox executes short Lua snippets in a fresh, restricted interpreter and
//! captures what they print. Each run yields exactly one result: the printed
//! lines, or a classified failure with a fixed-prefix message.
//!
//! # Features
//!
//! - **Isolated execution** - A new interpreter per run with a whitelisted environment.
//! - **Output capture** - `print` and `console.*` calls rendered as JSON lines.
//! - **Budgets** - Wall clock, instruction, memory, output and source size limits.
//! - **Failure classification** - Syntax, runtime and limit failures with source lines.
//! - **TOML configuration** - Limits, output settings and a topic catalog of examples.
//! - **Playgrounds** - Editable snippets with an explicit run state machine.

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, Example, OutputConfig, Topic};
pub use output::{OutputFormat, OutputSink, RenderError, SinkError};
pub use runner::{Runner, RunnerError};
pub use sandbox::{CHUNK_NAME, Sandbox};
pub use snippet::{Playground, RunState, Snippet, SnippetId};
pub use types::{Execution, ExecutionResult, Failure, FailureKind, ResourceLimits, RunStats};

pub mod config;
pub mod output;
pub mod runner;
pub mod sandbox;
pub mod snippet;
pub mod types;
