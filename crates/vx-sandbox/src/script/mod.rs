//! The sandboxed script language: a small JavaScript-flavoured subset.
//!
//! Source text goes through [`lexer`] and [`parser`] into an AST that
//! [`interp`] evaluates against a fresh global scope. Scripts see only the
//! globals installed here; the host is reachable solely through the
//! [`OutputSink`] behind `console`.

pub mod ast;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod value;

use vx_types::config::SandboxConfig;
use vx_types::console::LogKind;

pub use error::{ErrorKind, ScriptError};

/// Resource limits for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Limits {
    pub max_steps: u64,
    pub max_call_depth: usize,
    pub max_nesting: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self::from(&SandboxConfig::default())
    }
}

impl From<&SandboxConfig> for Limits {
    fn from(cfg: &SandboxConfig) -> Self {
        Self {
            max_steps: cfg.max_steps,
            max_call_depth: cfg.max_call_depth,
            max_nesting: cfg.max_nesting,
        }
    }
}

/// Receiver for console output produced by a script.
pub trait OutputSink {
    fn emit(&mut self, kind: LogKind, text: String);

    /// Polled during execution; `true` stops the script.
    fn cancelled(&self) -> bool;
}

/// Parse and run `source`. Console output goes to `sink`; the first
/// uncaught failure is returned.
pub fn execute(source: &str, limits: &Limits, sink: &mut dyn OutputSink) -> Result<(), ScriptError> {
    let program = parser::parse_program(source, limits.max_nesting)?;
    log::trace!("parsed {} top-level statements", program.len());
    interp::run(&program, limits, sink)
}
