//! Command interpreter for VX_OS.
//!
//! Parses scroll directives (`new file <name>`, `open`, `delete`, `run`) and
//! palette queries, and dispatches them against the filesystem store, the
//! window manager, and the sandbox through an [`Environment`].

pub mod interpreter;
pub mod palette;
pub mod scroll_commands;
pub mod session;

#[cfg(test)]
mod testutil;

pub use interpreter::{Command, CommandOutput, CommandRegistry, Environment, tokenize};
pub use palette::{PaletteAction, PaletteEntry};
pub use scroll_commands::register_scroll_commands;
pub use session::OpenFiles;

/// A registry with the scroll commands installed.
pub fn scroll_registry() -> CommandRegistry {
    let mut reg = CommandRegistry::new();
    register_scroll_commands(&mut reg);
    reg
}
