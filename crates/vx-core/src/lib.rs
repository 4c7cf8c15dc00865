//! VX_OS core.
//!
//! The [`Desktop`] owns every subsystem and is the single place where state
//! changes. Front ends feed it command lines, palette selections, and
//! pointer events, and read back the file tree, tabs, console, and window
//! stack.

// Re-exports from vx-types (foundation types).
pub use vx_types::config;
pub use vx_types::console;
pub use vx_types::error;
pub use vx_types::input;

pub mod desktop;
pub use vx_jobs as jobs;
pub use vx_sandbox as sandbox;
pub use vx_terminal as terminal;
pub use vx_vfs as vfs;
pub use vx_wm as wm;

pub use desktop::{Desktop, Prompter};
