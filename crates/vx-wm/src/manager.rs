//! Window manager: z-order stack, focus, hit testing, and drag gestures.
//!
//! The window set is fixed at construction. Focus is derived from the stack
//! (the last id is topmost) rather than stored per window.

use std::collections::HashMap;

use vx_types::input::InputEvent;

use crate::window::{Point, TITLEBAR_H, WindowId, WindowState, default_layout};

/// What a pointer event did to the window stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmEvent {
    /// Nothing under the pointer, or nothing to do.
    None,
    /// A title bar was grabbed; the window is now topmost and dragging.
    DragStarted(WindowId),
    /// The dragging window moved to a new position.
    Moved(WindowId, Point),
    /// The active drag finished.
    DragEnded(WindowId),
    /// Click inside a window body, in window-content coordinates.
    ContentClick(WindowId, i32, i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DragState {
    id: WindowId,
    offset: Point,
}

#[derive(Debug, Clone)]
pub struct WindowManager {
    windows: HashMap<WindowId, WindowState>,
    z_order: Vec<WindowId>,
    drag: Option<DragState>,
}

impl Default for WindowManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowManager {
    /// All four windows at their default geometry, stacked in
    /// [`WindowId::ALL`] order.
    pub fn new() -> Self {
        Self {
            windows: WindowId::ALL
                .into_iter()
                .map(|id| (id, default_layout(id)))
                .collect(),
            z_order: WindowId::ALL.to_vec(),
            drag: None,
        }
    }

    // -- Focus ----------------------------------------------------------------

    /// Move `id` to the top of the stack.
    pub fn bring_to_front(&mut self, id: WindowId) {
        if self.focused() == id {
            return;
        }
        self.z_order.retain(|w| *w != id);
        self.z_order.push(id);
        log::debug!("Focused {id}");
    }

    /// The topmost window.
    pub fn focused(&self) -> WindowId {
        // The stack always holds all four ids.
        self.z_order
            .last()
            .copied()
            .unwrap_or(WindowId::ALL[WindowId::ALL.len() - 1])
    }

    pub fn is_focused(&self, id: WindowId) -> bool {
        self.focused() == id
    }

    /// Stack from bottom to top.
    pub fn z_order(&self) -> &[WindowId] {
        &self.z_order
    }

    pub fn window(&self, id: WindowId) -> WindowState {
        self.windows
            .get(&id)
            .copied()
            .unwrap_or_else(|| default_layout(id))
    }

    /// Topmost window containing `p`.
    pub fn window_at(&self, p: Point) -> Option<WindowId> {
        self.z_order
            .iter()
            .rev()
            .copied()
            .find(|id| self.window(*id).contains(p))
    }

    // -- Drag -----------------------------------------------------------------

    /// Start dragging `id`, replacing any drag in progress. Does not change
    /// the stack.
    pub fn drag_start(&mut self, id: WindowId, pointer: Point) {
        if let Some(prev) = self.drag
            && prev.id != id
        {
            log::debug!("Drag of {} superseded by {id}", prev.id);
        }
        let offset = pointer - self.window(id).position;
        self.drag = Some(DragState { id, offset });
    }

    /// Reposition the dragging window under `pointer`.
    pub fn drag_move(&mut self, pointer: Point) -> Option<WindowId> {
        let drag = self.drag?;
        let pos = pointer - drag.offset;
        if let Some(state) = self.windows.get_mut(&drag.id) {
            state.position = pos;
        }
        Some(drag.id)
    }

    /// Finish the active drag, if any.
    pub fn drag_end(&mut self) -> Option<WindowId> {
        self.drag.take().map(|d| d.id)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn dragging(&self) -> Option<WindowId> {
        self.drag.map(|d| d.id)
    }

    /// Scoped drag: the gesture ends when the returned guard drops.
    pub fn begin_drag(&mut self, id: WindowId, pointer: Point) -> DragSession<'_> {
        self.drag_start(id, pointer);
        DragSession { wm: self, id }
    }

    // -- Input ----------------------------------------------------------------

    /// Route one pointer event.
    pub fn handle_input(&mut self, event: &InputEvent) -> WmEvent {
        match *event {
            InputEvent::PointerClick { x, y } => {
                let p = Point::new(x, y);
                let Some(id) = self.window_at(p) else {
                    return WmEvent::None;
                };
                self.bring_to_front(id);
                let win = self.window(id);
                if win.in_title_bar(p) {
                    self.drag_start(id, p);
                    WmEvent::DragStarted(id)
                } else {
                    WmEvent::ContentClick(
                        id,
                        x.saturating_sub(win.position.x),
                        y.saturating_sub(win.position.y).saturating_sub(TITLEBAR_H),
                    )
                }
            },
            InputEvent::CursorMove { x, y } => match self.drag_move(Point::new(x, y)) {
                Some(id) => WmEvent::Moved(id, self.window(id).position),
                None => WmEvent::None,
            },
            InputEvent::PointerRelease { .. } | InputEvent::FocusLost => match self.drag_end() {
                Some(id) => WmEvent::DragEnded(id),
                None => WmEvent::None,
            },
        }
    }
}

/// Guard for an in-progress drag. Dropping it ends the drag.
#[derive(Debug)]
pub struct DragSession<'a> {
    wm: &'a mut WindowManager,
    id: WindowId,
}

impl DragSession<'_> {
    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Move the dragged window; returns its new position.
    pub fn move_to(&mut self, pointer: Point) -> Point {
        self.wm.drag_move(pointer);
        self.wm.window(self.id).position
    }
}

impl Drop for DragSession<'_> {
    fn drop(&mut self) {
        self.wm.drag_end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_stack_has_every_window() {
        let wm = WindowManager::new();
        assert_eq!(wm.z_order(), &WindowId::ALL);
        assert!(wm.is_focused(WindowId::Jobs));
    }

    #[test]
    fn bring_to_front_moves_to_end() {
        let mut wm = WindowManager::new();
        wm.bring_to_front(WindowId::Explorer);
        assert_eq!(
            wm.z_order(),
            &[
                WindowId::Editor,
                WindowId::Console,
                WindowId::Jobs,
                WindowId::Explorer
            ]
        );
        wm.bring_to_front(WindowId::Explorer);
        assert_eq!(wm.z_order().len(), 4);
        assert_eq!(wm.focused(), WindowId::Explorer);
    }

    #[test]
    fn drag_preserves_grab_offset() {
        let mut wm = WindowManager::new();
        let start = wm.window(WindowId::Editor).position;
        let grab = Point::new(start.x + 15, start.y + 5);
        wm.drag_start(WindowId::Editor, grab);
        wm.drag_move(Point::new(grab.x + 100, grab.y - 7));
        assert_eq!(
            wm.window(WindowId::Editor).position,
            Point::new(start.x + 100, start.y - 7)
        );
        assert_eq!(wm.drag_end(), Some(WindowId::Editor));
        // Moves after the drag ends are ignored.
        assert_eq!(wm.drag_move(Point::new(0, 0)), None);
        assert_eq!(
            wm.window(WindowId::Editor).position,
            Point::new(start.x + 100, start.y - 7)
        );
    }

    #[test]
    fn drag_does_not_change_stack() {
        let mut wm = WindowManager::new();
        let before = wm.z_order().to_vec();
        wm.drag_start(WindowId::Explorer, Point::new(30, 30));
        wm.drag_move(Point::new(300, 300));
        wm.drag_end();
        assert_eq!(wm.z_order(), before.as_slice());
    }

    #[test]
    fn new_drag_replaces_old() {
        let mut wm = WindowManager::new();
        let console_before = wm.window(WindowId::Console).position;
        wm.drag_start(WindowId::Console, Point::new(300, 470));
        wm.drag_start(WindowId::Jobs, Point::new(30, 470));
        wm.drag_move(Point::new(40, 480));
        assert_eq!(wm.window(WindowId::Console).position, console_before);
        assert_eq!(wm.dragging(), Some(WindowId::Jobs));
    }

    #[test]
    fn drag_session_ends_on_drop() {
        let mut wm = WindowManager::new();
        {
            let mut session = wm.begin_drag(WindowId::Jobs, Point::new(25, 465));
            assert_eq!(session.id(), WindowId::Jobs);
            let pos = session.move_to(Point::new(125, 565));
            assert_eq!(pos, Point::new(120, 560));
        }
        assert!(!wm.is_dragging());
    }

    #[test]
    fn click_on_title_bar_focuses_and_drags() {
        let mut wm = WindowManager::new();
        let editor = wm.window(WindowId::Editor);
        let p = Point::new(editor.position.x + 10, editor.position.y + 2);
        let ev = wm.handle_input(&InputEvent::PointerClick { x: p.x, y: p.y });
        assert_eq!(ev, WmEvent::DragStarted(WindowId::Editor));
        assert!(wm.is_focused(WindowId::Editor));

        let ev = wm.handle_input(&InputEvent::CursorMove {
            x: p.x + 5,
            y: p.y + 5,
        });
        assert_eq!(
            ev,
            WmEvent::Moved(
                WindowId::Editor,
                Point::new(editor.position.x + 5, editor.position.y + 5)
            )
        );
        let ev = wm.handle_input(&InputEvent::PointerRelease { x: 0, y: 0 });
        assert_eq!(ev, WmEvent::DragEnded(WindowId::Editor));
    }

    #[test]
    fn drag_to_extreme_coordinates_saturates() {
        let mut wm = WindowManager::new();
        let ev = wm.handle_input(&InputEvent::PointerClick { x: 300, y: 25 });
        assert_eq!(ev, WmEvent::DragStarted(WindowId::Editor));
        let ev = wm.handle_input(&InputEvent::CursorMove { x: i32::MIN, y: 25 });
        assert_eq!(ev, WmEvent::Moved(WindowId::Editor, Point::new(i32::MIN, 20)));
        let ev = wm.handle_input(&InputEvent::CursorMove {
            x: i32::MAX,
            y: i32::MAX,
        });
        assert_eq!(
            ev,
            WmEvent::Moved(WindowId::Editor, Point::new(i32::MAX - 20, i32::MAX - 5))
        );
        wm.drag_end();

        wm.drag_start(WindowId::Console, Point::new(i32::MIN, i32::MIN));
        wm.drag_move(Point::new(i32::MAX, 0));
        assert_eq!(
            wm.window(WindowId::Console).position,
            Point::new(i32::MAX, i32::MAX)
        );
    }

    #[test]
    fn click_in_body_is_content_click() {
        let mut wm = WindowManager::new();
        let c = wm.window(WindowId::Console);
        let ev = wm.handle_input(&InputEvent::PointerClick {
            x: c.position.x + 7,
            y: c.position.y + TITLEBAR_H + 3,
        });
        assert_eq!(ev, WmEvent::ContentClick(WindowId::Console, 7, 3));
        assert!(!wm.is_dragging());
        assert!(wm.is_focused(WindowId::Console));
    }

    #[test]
    fn click_on_empty_desktop_is_ignored() {
        let mut wm = WindowManager::new();
        let before = wm.z_order().to_vec();
        assert_eq!(
            wm.handle_input(&InputEvent::PointerClick { x: -50, y: -50 }),
            WmEvent::None
        );
        assert_eq!(wm.z_order(), before.as_slice());
    }

    #[test]
    fn focus_lost_ends_drag() {
        let mut wm = WindowManager::new();
        wm.drag_start(WindowId::Explorer, Point::new(25, 25));
        assert_eq!(
            wm.handle_input(&InputEvent::FocusLost),
            WmEvent::DragEnded(WindowId::Explorer)
        );
        assert!(!wm.is_dragging());
    }

    #[test]
    fn overlapping_windows_hit_topmost() {
        let mut wm = WindowManager::new();
        // Stack the explorer right over the editor's corner.
        let editor = wm.window(WindowId::Editor).position;
        wm.drag_start(WindowId::Explorer, wm.window(WindowId::Explorer).position);
        wm.drag_move(editor);
        wm.drag_end();
        wm.bring_to_front(WindowId::Explorer);
        assert_eq!(wm.window_at(editor), Some(WindowId::Explorer));
        wm.bring_to_front(WindowId::Editor);
        assert_eq!(wm.window_at(editor), Some(WindowId::Editor));
    }

    mod prop {
        use proptest::prelude::*;

        use super::*;

        fn any_id() -> impl Strategy<Value = WindowId> {
            prop::sample::select(WindowId::ALL.to_vec())
        }

        proptest! {
            #[test]
            fn stack_is_always_a_permutation(ids in prop::collection::vec(any_id(), 0..40)) {
                let mut wm = WindowManager::new();
                for id in ids {
                    wm.bring_to_front(id);
                    prop_assert_eq!(wm.focused(), id);
                    let mut sorted = wm.z_order().to_vec();
                    sorted.sort_by_key(|w| w.as_str());
                    let mut all = WindowId::ALL.to_vec();
                    all.sort_by_key(|w| w.as_str());
                    prop_assert_eq!(sorted, all);
                }
            }

            #[test]
            fn drag_only_moves_dragged_window(
                id in any_id(),
                dx in -500i32..500,
                dy in -500i32..500,
            ) {
                let mut wm = WindowManager::new();
                let before: Vec<_> = WindowId::ALL.iter().map(|w| wm.window(*w)).collect();
                let grab = wm.window(id).position;
                wm.drag_start(id, grab);
                wm.drag_move(Point::new(grab.x + dx, grab.y + dy));
                wm.drag_end();
                for (w, old) in WindowId::ALL.iter().zip(before) {
                    if *w == id {
                        prop_assert_eq!(
                            wm.window(*w).position,
                            Point::new(old.position.x + dx, old.position.y + dy)
                        );
                    } else {
                        prop_assert_eq!(wm.window(*w), old);
                    }
                }
            }
        }
    }
}
