//! Platform-agnostic pointer events.
//!
//! Front ends map their native pointer input to these events before handing
//! them to the window manager.

/// A platform-agnostic input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Cursor moved to absolute position.
    CursorMove { x: i32, y: i32 },
    /// Pointer pressed at absolute position (mouse or touch).
    PointerClick { x: i32, y: i32 },
    /// Pointer released.
    PointerRelease { x: i32, y: i32 },
    /// The desktop lost focus (ends any gesture in progress).
    FocusLost,
}

impl InputEvent {
    /// Pointer position carried by the event, if any.
    pub fn position(&self) -> Option<(i32, i32)> {
        match *self {
            InputEvent::CursorMove { x, y }
            | InputEvent::PointerClick { x, y }
            | InputEvent::PointerRelease { x, y } => Some((x, y)),
            InputEvent::FocusLost => None,
        }
    }
}
