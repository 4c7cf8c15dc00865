//! Window manager for VX_OS.
//!
//! Four fixed windows (explorer, editor, console, jobs) in a z-order stack.
//! The manager knows geometry and focus only; window contents belong to the
//! desktop.

pub mod manager;
pub mod window;

pub use manager::{DragSession, WindowManager, WmEvent};
pub use window::{Point, Size, TITLEBAR_H, WindowId, WindowState, default_layout};
