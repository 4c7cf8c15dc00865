//! Window identities, geometry, and the built-in layout.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vx_types::error::VxError;

// -- Layout constants ---------------------------------------------------------

/// Height of the draggable title bar at the top of every window.
pub const TITLEBAR_H: i32 = 24;

// -- Types --------------------------------------------------------------------

/// The four fixed windows of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowId {
    Explorer,
    Editor,
    Console,
    Jobs,
}

impl WindowId {
    /// Every window, in initial stacking order (bottom first).
    pub const ALL: [WindowId; 4] = [
        WindowId::Explorer,
        WindowId::Editor,
        WindowId::Console,
        WindowId::Jobs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WindowId::Explorer => "explorer",
            WindowId::Editor => "editor",
            WindowId::Console => "console",
            WindowId::Jobs => "jobs",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WindowId::Explorer => "Explorer",
            WindowId::Editor => "Editor",
            WindowId::Console => "Console",
            WindowId::Jobs => "Jobs",
        }
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowId {
    type Err = VxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WindowId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| VxError::Wm(format!("unknown window: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Saturates at the `i32` bounds; pointer coordinates are unchecked input.
impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

/// Geometry of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowState {
    pub position: Point,
    pub size: Size,
}

impl WindowState {
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self {
            position: Point::new(x, y),
            size: Size { w, h },
        }
    }

    /// Whether `p` falls inside the window frame.
    pub fn contains(&self, p: Point) -> bool {
        let Point { x, y } = self.position;
        p.x >= x
            && p.y >= y
            && i64::from(p.x) < i64::from(x) + i64::from(self.size.w)
            && i64::from(p.y) < i64::from(y) + i64::from(self.size.h)
    }

    /// Whether `p` falls inside the title bar strip.
    pub fn in_title_bar(&self, p: Point) -> bool {
        self.contains(p) && p.y < self.position.y.saturating_add(TITLEBAR_H)
    }
}

/// Built-in starting geometry.
pub fn default_layout(id: WindowId) -> WindowState {
    match id {
        WindowId::Explorer => WindowState::new(20, 20, 240, 420),
        WindowId::Editor => WindowState::new(280, 20, 560, 420),
        WindowId::Console => WindowState::new(280, 460, 560, 200),
        WindowId::Jobs => WindowState::new(20, 460, 240, 200),
    }
}
