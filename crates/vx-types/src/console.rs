//! Console line model shared by the sandbox, the interpreter, and the views.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a console line (also the `kind` field on the sandbox wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Log,
    Error,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogKind::Log => f.write_str("log"),
            LogKind::Error => f.write_str("error"),
        }
    }
}

/// One line of console output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub kind: LogKind,
    pub text: String,
}

impl ConsoleLine {
    pub fn log(text: impl Into<String>) -> Self {
        Self {
            kind: LogKind::Log,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: LogKind::Error,
            text: text.into(),
        }
    }
}

/// Append-only console buffer. Only `clear` removes lines.
#[derive(Debug, Default, Clone)]
pub struct Console {
    lines: Vec<ConsoleLine>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line.
    pub fn push(&mut self, line: ConsoleLine) {
        self.lines.push(line);
    }

    /// Append a `log` line.
    pub fn log(&mut self, text: impl Into<String>) {
        self.push(ConsoleLine::log(text));
    }

    /// Append an `error` line.
    pub fn error(&mut self, text: impl Into<String>) {
        self.push(ConsoleLine::error(text));
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[ConsoleLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of `error` lines currently buffered.
    pub fn error_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| l.kind == LogKind::Error)
            .count()
    }
}
