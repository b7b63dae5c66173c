//! Snippets and the playground that runs them
//!
//! A [`Playground`] owns one editable [`Snippet`] and the result of its last
//! run. Editing never runs anything; it only marks the shown result stale.

use std::fmt;

use tracing::debug;

use crate::config::Example;
use crate::sandbox::Sandbox;
use crate::types::{ExecutionResult, Failure, RunStats};

/// Identifies the topic example a snippet belongs to (`"<topic>/<slug>"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnippetId(String);

impl SnippetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Editable source text. Any text is accepted, including code that does not
/// compile.
#[derive(Debug, Clone)]
pub struct Snippet {
    id: SnippetId,
    source: String,
}

impl Snippet {
    pub fn new(id: SnippetId, source: impl Into<String>) -> Self {
        Self {
            id,
            source: source.into(),
        }
    }

    pub fn id(&self) -> &SnippetId {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Replace the whole source text
    pub fn set_source(&mut self, text: impl Into<String>) {
        self.source = text.into();
    }
}

/// Where a playground is in its edit/run cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Not run since the last edit
    Idle,
    /// A run is in progress
    Running,
    Succeeded(String),
    Failed(Failure),
}

impl RunState {
    /// Whether the state holds the outcome of a run
    pub fn is_finished(&self) -> bool {
        matches!(self, RunState::Succeeded(_) | RunState::Failed(_))
    }
}

/// One snippet plus the sandbox that runs it
#[derive(Debug, Clone)]
pub struct Playground {
    snippet: Snippet,
    sandbox: Sandbox,
    state: RunState,
    stats: Option<RunStats>,
}

impl Playground {
    pub fn new(snippet: Snippet, sandbox: Sandbox) -> Self {
        Self {
            snippet,
            sandbox,
            state: RunState::Idle,
            stats: None,
        }
    }

    /// Seed a playground with an example's code
    pub fn from_example(sandbox: Sandbox, topic_id: &str, example: &Example) -> Self {
        let snippet = Snippet::new(example.snippet_id(topic_id), example.code.as_str());
        Self::new(snippet, sandbox)
    }

    pub fn snippet(&self) -> &Snippet {
        &self.snippet
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Stats of the last finished run, cleared by edits
    pub fn stats(&self) -> Option<&RunStats> {
        self.stats.as_ref()
    }

    /// True when there is no result for the current source
    pub fn is_stale(&self) -> bool {
        !self.state.is_finished()
    }

    /// Replace the source. Any previous result no longer applies.
    pub fn edit(&mut self, text: impl Into<String>) {
        self.snippet.set_source(text);
        self.state = RunState::Idle;
        self.stats = None;
        debug!(snippet = %self.snippet.id(), "snippet edited");
    }

    /// Run the current source and return the new state
    pub fn run(&mut self) -> &RunState {
        self.state = RunState::Running;
        let execution = self.sandbox.execute(self.snippet.source());

        self.state = match execution.result {
            ExecutionResult::Success { output } => RunState::Succeeded(output),
            ExecutionResult::Failure(failure) => RunState::Failed(failure),
        };
        self.stats = Some(execution.stats);
        debug!(snippet = %self.snippet.id(), finished = ?self.state, "snippet run");

        &self.state
    }

    /// The result of the last run as an [`ExecutionResult`], if it is current
    pub fn result(&self) -> Option<ExecutionResult> {
        match &self.state {
            RunState::Succeeded(output) => Some(ExecutionResult::Success {
                output: output.clone(),
            }),
            RunState::Failed(failure) => Some(ExecutionResult::Failure(failure.clone())),
            RunState::Idle | RunState::Running => None,
        }
    }
}
