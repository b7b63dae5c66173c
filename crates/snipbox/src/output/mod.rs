//! Output sink for intercepted diagnostic calls
//!
//! One sink is created per run. Each intercepted call appends exactly one
//! line: its arguments rendered and joined with a single space.

use mlua::Value;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::output::render::{MAX_DEPTH, RenderError, render_arg, to_json};

mod render;

/// How printed values are turned into text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Every argument as compact JSON; strings are quoted
    #[default]
    Json,

    /// Like `Json`, but top-level strings are printed as-is
    Display,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("output limit of {0} lines exceeded")]
    LimitExceeded(usize),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Append-only, ordered buffer of rendered lines
#[derive(Debug, Default)]
pub struct OutputSink {
    lines: Vec<String>,
    max_lines: Option<usize>,
    format: OutputFormat,
}

impl OutputSink {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            lines: Vec::new(),
            max_lines: None,
            format,
        }
    }

    /// Cap the number of lines; pushing past the cap fails
    pub fn with_max_lines(mut self, max_lines: Option<usize>) -> Self {
        self.max_lines = max_lines;
        self
    }

    /// Render the arguments of one diagnostic call and append them as a line
    pub fn record(&mut self, args: &[Value]) -> Result<(), SinkError> {
        let line = format_line(args, self.format)?;
        self.push(line)
    }

    /// Like [`record`](Self::record), with `prefix` written in front of the line
    pub fn record_prefixed(&mut self, prefix: &str, args: &[Value]) -> Result<(), SinkError> {
        let line = format_line(args, self.format)?;
        self.push(format!("{prefix}{line}"))
    }

    /// Append an already rendered line
    pub fn push(&mut self, line: String) -> Result<(), SinkError> {
        if let Some(max) = self.max_lines
            && self.lines.len() >= max
        {
            return Err(SinkError::LimitExceeded(max));
        }
        self.lines.push(line);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines joined with `\n`; empty sink gives an empty string
    pub fn join(&self) -> String {
        self.lines.join("\n")
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Render every argument and join them with one space
pub fn format_line(args: &[Value], format: OutputFormat) -> Result<String, RenderError> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(render_arg(arg, format)?);
    }
    Ok(parts.join(" "))
}
