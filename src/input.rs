//! Keyboard and pointer input.
//!
//! [`Input`] turns raw winit window events into per-frame key state for the
//! control surface. [`Pointer`] samples the cursor once per frame and
//! remembers when it last moved, so pointer mode can stop injecting force
//! shortly after the cursor comes to rest.
//!
//! ```ignore
//! if input.key_pressed(KeyCode::B) {
//!     options.is_bounce = !options.is_bounce;
//! }
//! pointer.sample(input.cursor_ndc(), now);
//! let source = pointer.source(now);
//! ```

use glam::Vec2;
use std::collections::HashSet;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode as WinitKeyCode, PhysicalKey};

use crate::body::{MOVE_EPSILON, MOVE_TIMEOUT};
use crate::source::Source;

/// Keys the control surface responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    B,
    C,
    M,
    S,
    T,
    V,
    W,
    Up,
    Down,
    Space,
    Escape,
    Other(u32),
}

impl From<WinitKeyCode> for KeyCode {
    fn from(key: WinitKeyCode) -> Self {
        match key {
            WinitKeyCode::KeyB => KeyCode::B,
            WinitKeyCode::KeyC => KeyCode::C,
            WinitKeyCode::KeyM => KeyCode::M,
            WinitKeyCode::KeyS => KeyCode::S,
            WinitKeyCode::KeyT => KeyCode::T,
            WinitKeyCode::KeyV => KeyCode::V,
            WinitKeyCode::KeyW => KeyCode::W,
            WinitKeyCode::ArrowUp => KeyCode::Up,
            WinitKeyCode::ArrowDown => KeyCode::Down,
            WinitKeyCode::Space => KeyCode::Space,
            WinitKeyCode::Escape => KeyCode::Escape,
            _ => KeyCode::Other(key as u32),
        }
    }
}

/// Keyboard and cursor state collected from window events.
#[derive(Debug, Default)]
pub struct Input {
    keys_held: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,

    cursor_ndc: Option<Vec2>,
    scroll_delta: f32,

    window_size: (u32, u32),
}

impl Input {
    pub fn new() -> Self {
        Self {
            window_size: (800, 600),
            ..Default::default()
        }
    }

    /// Check if a key was pressed this frame (just went down).
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// Cursor position in NDC, `None` until the cursor enters the window.
    pub fn cursor_ndc(&self) -> Option<Vec2> {
        self.cursor_ndc
    }

    /// Scroll wheel delta this frame. Positive is up.
    pub fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }

    /// Clear per-frame state. Call after the frame has consumed it.
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
        self.scroll_delta = 0.0;
    }

    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
    }

    /// Process a winit window event.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    let key = KeyCode::from(keycode);
                    match event.state {
                        ElementState::Pressed => {
                            // No key repeat
                            if !self.keys_held.contains(&key) {
                                self.keys_pressed.insert(key);
                            }
                            self.keys_held.insert(key);
                        }
                        ElementState::Released => {
                            self.keys_held.remove(&key);
                        }
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                let (w, h) = self.window_size;
                if w > 0 && h > 0 {
                    self.cursor_ndc = Some(Vec2::new(
                        (position.x as f32 / w as f32) * 2.0 - 1.0,
                        1.0 - (position.y as f32 / h as f32) * 2.0,
                    ));
                }
            }

            WindowEvent::CursorLeft { .. } => {
                self.cursor_ndc = None;
            }

            WindowEvent::MouseWheel { delta, .. } => {
                self.scroll_delta += match delta {
                    winit::event::MouseScrollDelta::LineDelta(_, y) => *y,
                    winit::event::MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
            }

            _ => {}
        }
    }
}

/// A mouse or touch pointer sampled once per frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct Pointer {
    coords: Option<Vec2>,
    diff: Vec2,
    last_moved: f32,
}

impl Pointer {
    pub fn new() -> Self {
        Self {
            coords: None,
            diff: Vec2::ZERO,
            last_moved: f32::NEG_INFINITY,
        }
    }

    /// Record the cursor position for this frame.
    ///
    /// The first sample after the cursor enters has no displacement, so
    /// entering the window never produces a jump.
    pub fn sample(&mut self, coords: Option<Vec2>, now: f32) {
        match (self.coords, coords) {
            (Some(prev), Some(next)) => {
                self.diff = next - prev;
                if self.diff.length() > MOVE_EPSILON {
                    self.last_moved = now;
                }
            }
            _ => self.diff = Vec2::ZERO,
        }
        self.coords = coords;
    }

    pub fn coords(&self) -> Option<Vec2> {
        self.coords
    }

    pub fn moved(&self, now: f32) -> bool {
        now - self.last_moved < MOVE_TIMEOUT
    }

    /// The pointer as an injection source, `None` while outside the window.
    pub fn source(&self, now: f32) -> Option<Source> {
        self.coords.map(|coords| Source {
            coords,
            diff: self.diff,
            moved: self.moved(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_state() {
        let mut input = Input::new();

        assert!(!input.key_held(KeyCode::Space));
        assert!(!input.key_pressed(KeyCode::Space));

        input.keys_pressed.insert(KeyCode::Space);
        input.keys_held.insert(KeyCode::Space);

        assert!(input.key_held(KeyCode::Space));
        assert!(input.key_pressed(KeyCode::Space));

        // Pressed is per-frame, held persists
        input.end_frame();
        assert!(input.key_held(KeyCode::Space));
        assert!(!input.key_pressed(KeyCode::Space));
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(KeyCode::from(WinitKeyCode::KeyB), KeyCode::B);
        assert_eq!(KeyCode::from(WinitKeyCode::ArrowDown), KeyCode::Down);
        assert!(matches!(KeyCode::from(WinitKeyCode::KeyQ), KeyCode::Other(_)));
    }

    #[test]
    fn test_pointer_first_sample_has_no_diff() {
        let mut pointer = Pointer::new();
        pointer.sample(Some(Vec2::new(0.5, 0.5)), 1.0);
        let source = pointer.source(1.0).unwrap();
        assert_eq!(source.diff, Vec2::ZERO);
        assert!(!source.moved);
    }

    #[test]
    fn test_pointer_moves_then_rests() {
        let mut pointer = Pointer::new();
        pointer.sample(Some(Vec2::ZERO), 0.0);
        pointer.sample(Some(Vec2::new(0.1, -0.1)), 0.016);
        let source = pointer.source(0.016).unwrap();
        assert!(source.moved);
        assert!((source.diff - Vec2::new(0.1, -0.1)).length() < 1e-6);

        pointer.sample(Some(Vec2::new(0.1, -0.1)), 0.2);
        let source = pointer.source(0.2).unwrap();
        assert_eq!(source.diff, Vec2::ZERO);
        assert!(!source.moved);
    }

    #[test]
    fn test_pointer_outside_window() {
        let mut pointer = Pointer::new();
        pointer.sample(Some(Vec2::ZERO), 0.0);
        pointer.sample(None, 0.016);
        assert!(pointer.source(0.016).is_none());
    }
}
