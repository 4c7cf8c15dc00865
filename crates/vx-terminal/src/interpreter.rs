//! Command trait, registry, and dispatch logic.
//!
//! Dispatch never fails outward: unknown commands and command errors become
//! a single error line on the console.

use std::collections::HashMap;

use vx_sandbox::SandboxExecutor;
use vx_types::console::Console;
use vx_types::error::{Result, VxError};
use vx_vfs::FsStore;
use vx_wm::WindowManager;

use crate::session::OpenFiles;

/// Outcome of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// Nothing happened (empty input).
    None,
    /// A blank name was given; the command was skipped.
    Ignored,
    /// A file was created (or reset) and opened.
    Created(String),
    /// A file was opened in the editor.
    Opened(String),
    /// A file was removed.
    Deleted(String),
    /// The current file was handed to the sandbox.
    Running(Option<String>),
    /// The command failed; the error line is already on the console.
    Failed,
}

/// Shared mutable environment passed to every command.
pub struct Environment<'a> {
    /// The filesystem store.
    pub fs: &'a mut FsStore,
    /// Editor tabs.
    pub files: &'a mut OpenFiles,
    /// Console output buffer.
    pub console: &'a mut Console,
    /// Sandbox executor for `run`.
    pub sandbox: &'a mut SandboxExecutor,
    /// Window stack.
    pub wm: &'a mut WindowManager,
}

/// A single executable command.
pub trait Command {
    /// The command name (what the user types).
    fn name(&self) -> &str;

    /// One-line description for listings.
    fn description(&self) -> &str;

    /// Usage string (e.g. "open <name>").
    fn usage(&self) -> &str;

    /// Command category for grouping.
    fn category(&self) -> &str {
        "general"
    }

    /// Execute the command with the given arguments and environment.
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput>;
}

/// Registry of available commands with dispatch.
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    /// Create an empty command registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Register a command. Replaces any existing command with the same name.
    pub fn register(&mut self, cmd: Box<dyn Command>) {
        self.commands.insert(cmd.name().to_ascii_lowercase(), cmd);
    }

    /// Run `command` with `args`. Command names are case-insensitive.
    ///
    /// Unknown commands and command errors append exactly one error line to
    /// the console and return [`CommandOutput::Failed`].
    pub fn dispatch(
        &self,
        command: &str,
        args: &[&str],
        env: &mut Environment<'_>,
    ) -> CommandOutput {
        let Some(cmd) = self.commands.get(&command.to_ascii_lowercase()) else {
            let shown = if command.is_empty() { "(empty)" } else { command };
            log::debug!("Unknown command {command:?}");
            env.console.error(format!("Unknown command: {shown}"));
            return CommandOutput::Failed;
        };
        match cmd.execute(args, env) {
            Ok(output) => {
                log::debug!("{} -> {output:?}", cmd.name());
                output
            },
            Err(e) => {
                log::debug!("{} failed: {e}", cmd.name());
                env.console.error(error_line(&e));
                CommandOutput::Failed
            },
        }
    }

    /// Tokenize and dispatch a full command line.
    pub fn execute_line(&self, line: &str, env: &mut Environment<'_>) -> CommandOutput {
        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(e) => {
                env.console.error(error_line(&e));
                return CommandOutput::Failed;
            },
        };
        let Some((command, rest)) = tokens.split_first() else {
            return CommandOutput::None;
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        self.dispatch(command, &args, env)
    }

    /// Sorted `(name, description)` pairs.
    pub fn list_commands(&self) -> Vec<(&str, &str)> {
        let mut cmds: Vec<(&str, &str)> = self
            .commands
            .values()
            .map(|c| (c.name(), c.description()))
            .collect();
        cmds.sort_by_key(|(name, _)| *name);
        cmds
    }

    /// Usage string for `name`, if registered.
    pub fn usage(&self, name: &str) -> Option<&str> {
        self.commands
            .get(&name.to_ascii_lowercase())
            .map(|c| c.usage())
    }

    /// Return completions for a partial command name.
    pub fn completions(&self, partial: &str) -> Vec<String> {
        let lower = partial.to_ascii_lowercase();
        let mut out: Vec<String> = self
            .commands
            .keys()
            .filter(|name| name.starts_with(&lower))
            .cloned()
            .collect();
        out.sort();
        out
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Console text for a command failure.
fn error_line(e: &VxError) -> String {
    match e {
        VxError::Command(msg) => msg.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tokenizer: handles single quotes, double quotes, and backslash escapes.
// ---------------------------------------------------------------------------

/// Tokenize a command line respecting quotes and backslash escapes.
///
/// - Single-quoted strings preserve all characters literally.
/// - Inside double quotes, `\"` and `\\` are escapes.
/// - Backslash escapes the next character outside of quotes.
/// - `''` and `""` produce an empty token.
pub fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = input.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(ch) = chars.next() {
        if in_single {
            if ch == '\'' {
                in_single = false;
            } else {
                current.push(ch);
            }
        } else if in_double {
            if ch == '"' {
                in_double = false;
            } else if ch == '\\'
                && let Some(&next) = chars.peek()
                && matches!(next, '"' | '\\')
            {
                current.push(next);
                chars.next();
            } else {
                current.push(ch);
            }
        } else {
            match ch {
                '\'' => {
                    in_single = true;
                    quoted = true;
                },
                '"' => {
                    in_double = true;
                    quoted = true;
                },
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                },
                c if c.is_whitespace() => {
                    if !current.is_empty() || quoted {
                        tokens.push(std::mem::take(&mut current));
                        quoted = false;
                    }
                },
                _ => current.push(ch),
            }
        }
    }

    if in_single {
        return Err(VxError::Command("unterminated single quote".to_string()));
    }
    if in_double {
        return Err(VxError::Command("unterminated double quote".to_string()));
    }

    if !current.is_empty() || quoted {
        tokens.push(current);
    }

    Ok(tokens)
}
