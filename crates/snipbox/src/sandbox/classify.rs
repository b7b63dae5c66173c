//! Error classification
//!
//! Turns whatever the interpreter raised into a [`Failure`]. The chunk
//! position prefix (`snippet:3: `) moves into [`Failure::line`] and stack
//! tracebacks are dropped, so the message reads like the raised value.

use mlua::Error as LuaError;

use crate::output::SinkError;
use crate::sandbox::CHUNK_NAME;
use crate::sandbox::budget::Breach;
use crate::types::{Failure, FailureKind};

const TRACEBACK_MARKER: &str = "\nstack traceback:";

/// Classify a failed run. A recorded budget breach wins over the error that
/// surfaced, since the snippet may have rethrown or wrapped it.
pub fn classify(error: &LuaError, breach: Option<Breach>, tag: &str) -> Failure {
    if let Some(breach) = breach {
        return Failure::new(breach.kind(), tag, &breach.to_string(), None);
    }

    match root_cause(error) {
        LuaError::SyntaxError { message, .. } => located(FailureKind::Syntax, message, tag),
        LuaError::RuntimeError(message) => located(FailureKind::Runtime, message, tag),
        LuaError::MemoryError(_) => {
            Failure::new(FailureKind::MemoryLimit, tag, "memory limit exceeded", None)
        }
        LuaError::ExternalError(inner) => match inner.downcast_ref::<SinkError>() {
            Some(SinkError::LimitExceeded(limit)) => Failure::new(
                FailureKind::OutputLimit,
                tag,
                &Breach::OutputLines(*limit).to_string(),
                None,
            ),
            Some(SinkError::Render(err)) => {
                Failure::new(FailureKind::Render, tag, &err.to_string(), None)
            }
            None => located(FailureKind::Runtime, &inner.to_string(), tag),
        },
        other => located(FailureKind::Runtime, &other.to_string(), tag),
    }
}

/// Unwrap errors raised inside Rust callbacks down to what was raised
fn root_cause(error: &LuaError) -> &LuaError {
    match error {
        LuaError::CallbackError { cause, .. } => root_cause(cause),
        other => other,
    }
}

fn located(kind: FailureKind, message: &str, tag: &str) -> Failure {
    let message = strip_traceback(message);
    let (line, description) = split_location(message);
    Failure::new(kind, tag, description, line)
}

fn strip_traceback(message: &str) -> &str {
    match message.find(TRACEBACK_MARKER) {
        Some(idx) => &message[..idx],
        None => message,
    }
}

/// Split a leading `snippet:LINE: ` prefix off an interpreter message.
///
/// Only the snippet chunk's own name is recognised, plain (`snippet:3: `) or
/// quoted (`[string "snippet"]:3: `). Other `name:N:` text is part of the
/// raised message and stays there.
pub fn split_location(message: &str) -> (Option<u32>, &str) {
    let Some(rest) = strip_chunk_name(message) else {
        return (None, message);
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0
        && rest[digits..].starts_with(':')
        && let Ok(line) = rest[..digits].parse()
    {
        return (Some(line), rest[digits + 1..].trim_start());
    }
    (None, message)
}

/// Text after `snippet:` or `[string "..."]:`, if the message starts with one
fn strip_chunk_name(message: &str) -> Option<&str> {
    let name = CHUNK_NAME.trim_start_matches('=');
    if let Some(rest) = message.strip_prefix(name).and_then(|r| r.strip_prefix(':')) {
        return Some(rest);
    }

    let quoted = message.strip_prefix("[string \"")?;
    let first_line = quoted.lines().next().unwrap_or_default();
    let close = first_line.find("\"]:")?;
    Some(&quoted[close + 3..])
}
