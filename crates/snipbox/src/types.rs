use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-run budget for a snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Wall clock limit in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Maximum number of VM instructions
    #[serde(default)]
    pub instruction_limit: Option<u64>,

    /// Interpreter memory limit in bytes
    #[serde(default)]
    pub memory_limit: Option<usize>,

    /// Maximum number of diagnostic lines a run may produce
    #[serde(default)]
    pub max_output_lines: Option<usize>,

    /// Maximum source size in bytes
    #[serde(default)]
    pub max_source_bytes: Option<usize>,
}

impl ResourceLimits {
    /// 1 kibibyte in bytes
    pub const KIB: usize = 1024;
    /// 1 mebibyte in bytes
    pub const MIB: usize = 1024 * 1024;

    /// Create new resource limits with the default budget
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits with every field unset, useful as an override base
    pub fn unset() -> Self {
        Self {
            timeout_ms: None,
            instruction_limit: None,
            memory_limit: None,
            max_output_lines: None,
            max_source_bytes: None,
        }
    }

    /// Set the wall clock limit in milliseconds
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    /// Set the instruction budget
    pub fn with_instruction_limit(mut self, count: u64) -> Self {
        self.instruction_limit = Some(count);
        self
    }

    /// Set the interpreter memory limit in bytes
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    /// Set the maximum number of output lines
    pub fn with_max_output_lines(mut self, lines: usize) -> Self {
        self.max_output_lines = Some(lines);
        self
    }

    /// Set the maximum source size in bytes
    pub fn with_max_source_bytes(mut self, bytes: usize) -> Self {
        self.max_source_bytes = Some(bytes);
        self
    }

    /// The wall clock limit as a [`Duration`]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Apply overrides from another ResourceLimits, preferring values from `overrides`
    pub fn with_overrides(&self, overrides: &ResourceLimits) -> ResourceLimits {
        ResourceLimits {
            timeout_ms: overrides.timeout_ms.or(self.timeout_ms),
            instruction_limit: overrides.instruction_limit.or(self.instruction_limit),
            memory_limit: overrides.memory_limit.or(self.memory_limit),
            max_output_lines: overrides.max_output_lines.or(self.max_output_lines),
            max_source_bytes: overrides.max_source_bytes.or(self.max_source_bytes),
        }
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            timeout_ms: Some(2000),
            instruction_limit: Some(100_000_000),
            memory_limit: Some(64 * Self::MIB),
            max_output_lines: Some(5000),
            max_source_bytes: Some(64 * Self::KIB),
        }
    }
}

/// Outcome of one snippet run. Exactly one variant is produced per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResult {
    /// The snippet returned normally; `output` is the newline-joined sink
    Success { output: String },

    /// Compilation or execution failed
    Failure(Failure),
}

impl ExecutionResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }

    /// Joined output of a successful run
    pub fn output(&self) -> Option<&str> {
        match self {
            ExecutionResult::Success { output } => Some(output),
            ExecutionResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            ExecutionResult::Success { .. } => None,
            ExecutionResult::Failure(failure) => Some(failure),
        }
    }

    /// The text a presenter shows: the output, or the tagged failure message
    pub fn text(&self) -> &str {
        match self {
            ExecutionResult::Success { output } => output,
            ExecutionResult::Failure(failure) => &failure.message,
        }
    }
}

/// A classified failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,

    /// Human-readable description, prefixed with the configured error tag
    pub message: String,

    /// 1-based source line, when the interpreter reported one
    #[serde(default)]
    pub line: Option<u32>,
}

impl Failure {
    pub fn new(kind: FailureKind, tag: &str, description: &str, line: Option<u32>) -> Self {
        Self {
            kind,
            message: format!("{tag}{description}"),
            line,
        }
    }
}

/// Why a run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// The source does not compile
    #[serde(rename = "syntax")]
    Syntax,

    /// A value was raised while running
    #[serde(rename = "runtime")]
    Runtime,

    /// Wall clock or instruction budget exhausted
    #[serde(rename = "timeout")]
    Timeout,

    /// Interpreter memory limit exceeded
    #[serde(rename = "memory")]
    MemoryLimit,

    /// Too many diagnostic lines
    #[serde(rename = "output")]
    OutputLimit,

    /// A printed value has no textual representation (cycle, too deep)
    #[serde(rename = "render")]
    Render,

    /// The source was refused before compiling
    #[serde(rename = "rejected")]
    Rejected,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Syntax => "syntax",
            FailureKind::Runtime => "runtime",
            FailureKind::Timeout => "timeout",
            FailureKind::MemoryLimit => "memory",
            FailureKind::OutputLimit => "output",
            FailureKind::Render => "render",
            FailureKind::Rejected => "rejected",
        }
    }

    /// Budget breaches, as opposed to faults in the snippet itself
    #[must_use]
    pub fn is_limit(&self) -> bool {
        matches!(
            self,
            FailureKind::Timeout | FailureKind::MemoryLimit | FailureKind::OutputLimit
        )
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measurements taken during a run. Kept apart from [`ExecutionResult`] so
/// results stay comparable across runs.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Wall clock time spent compiling and running
    pub wall_time: Duration,

    /// Interpreter memory in use when the run ended, in bytes
    pub memory: usize,

    /// Lines accepted by the output sink
    pub output_lines: usize,
}

/// A result together with its stats
#[derive(Debug, Clone)]
pub struct Execution {
    pub result: ExecutionResult,
    pub stats: RunStats,
}
