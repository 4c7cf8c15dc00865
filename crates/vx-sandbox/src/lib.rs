//! Isolated script execution for VX_OS.
//!
//! A [`SandboxExecutor`] runs untrusted code on its own worker thread with a
//! fresh interpreter and no access to host state. Console output flows back
//! through a one-directional, marker-validated message channel
//! ([`message::channel`]).

pub mod embed;
pub mod executor;
pub mod message;
pub mod script;

pub use executor::{SandboxContext, SandboxExecutor};
pub use message::{Inbox, Outbox, SandboxMessage, channel};
pub use script::{ErrorKind, Limits, OutputSink, ScriptError};
