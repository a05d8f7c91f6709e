//! Winit input adapter for canvas-ui
//!
//! Converts winit window events into canvas-ui's backend-agnostic
//! [`InputEvent`] descriptors. Winit reports cursor position and modifier
//! state as separate events, so the adapter keeps both and stamps them onto
//! every event it produces.

use std::time::Instant;

use canvas_ui::{InputEvent, Key, Modifiers, MouseButton, NamedKey, Point, ScrollSource};
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::Key as WinitKey;

/// Stateful translator from winit [`WindowEvent`]s to [`InputEvent`]s
#[derive(Debug)]
pub struct WinitInputAdapter {
    cursor: Point,
    modifiers: Modifiers,
    /// Logical pixels per physical pixel
    scale: f32,
    epoch: Instant,
}

impl Default for WinitInputAdapter {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl WinitInputAdapter {
    pub fn new(scale_factor: f64) -> Self {
        Self {
            cursor: Point::zero(),
            modifiers: Modifiers::NONE,
            scale: 1.0 / scale_factor.max(f64::EPSILON) as f32,
            epoch: Instant::now(),
        }
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn set_scale_factor(&mut self, scale_factor: f64) {
        self.scale = 1.0 / scale_factor.max(f64::EPSILON) as f32;
    }

    /// Translate one window event. Returns `None` for events that carry no
    /// input (or only update adapter state, such as modifier changes).
    pub fn convert(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        let converted = match event {
            WindowEvent::ModifiersChanged(modifiers) => {
                let state = modifiers.state();
                self.modifiers = Modifiers {
                    shift: state.shift_key(),
                    ctrl: state.control_key(),
                    alt: state.alt_key(),
                    super_key: state.super_key(),
                };
                return None;
            }
            WindowEvent::CursorMoved { position, .. } => {
                let position = Point::new(position.x as f32 * self.scale, position.y as f32 * self.scale);
                let delta = Point::new(position.x - self.cursor.x, position.y - self.cursor.y);
                self.cursor = position;
                InputEvent::mouse_move(position, delta)
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = convert_mouse_button(*button);
                match state {
                    ElementState::Pressed => InputEvent::mouse_press(self.cursor, button),
                    ElementState::Released => InputEvent::mouse_release(self.cursor, button),
                }
            }
            WindowEvent::MouseWheel { delta, .. } => match delta {
                // Notched wheels report whole lines
                MouseScrollDelta::LineDelta(x, y) => {
                    InputEvent::wheel(self.cursor, Point::new(*x, *y), ScrollSource::Wheel)
                }
                // Precise scrolling devices report pixels
                MouseScrollDelta::PixelDelta(pos) => InputEvent::wheel(
                    self.cursor,
                    Point::new(pos.x as f32 * self.scale, pos.y as f32 * self.scale),
                    ScrollSource::Trackpad,
                ),
            },
            WindowEvent::PanGesture { delta, .. } => InputEvent::trackpad_pan(
                self.cursor,
                Point::new(delta.x * self.scale, delta.y * self.scale),
            ),
            WindowEvent::PinchGesture { delta, .. } => InputEvent::trackpad_zoom(self.cursor, *delta as f32),
            WindowEvent::RotationGesture { delta, .. } => InputEvent::trackpad_rotate(self.cursor, *delta),
            WindowEvent::KeyboardInput { event, .. } => {
                let key = convert_key(&event.logical_key);
                match event.state {
                    ElementState::Pressed => InputEvent::key_press(self.cursor, key),
                    ElementState::Released => InputEvent::key_release(self.cursor, key),
                }
            }
            _ => return None,
        };

        Some(
            converted
                .with_modifiers(self.modifiers)
                .with_timestamp(self.epoch.elapsed().as_secs_f64()),
        )
    }
}

/// Convert winit MouseButton to canvas-ui MouseButton
pub fn convert_mouse_button(button: winit::event::MouseButton) -> MouseButton {
    match button {
        winit::event::MouseButton::Left => MouseButton::Left,
        winit::event::MouseButton::Right => MouseButton::Right,
        winit::event::MouseButton::Middle => MouseButton::Middle,
        winit::event::MouseButton::Back => MouseButton::Other(3),
        winit::event::MouseButton::Forward => MouseButton::Other(4),
        winit::event::MouseButton::Other(n) => MouseButton::Other(n.min(u8::MAX as u16) as u8),
    }
}

/// Convert winit Key to canvas-ui Key
pub fn convert_key(key: &WinitKey) -> Key {
    match key {
        WinitKey::Named(named) => convert_named_key(named).map_or(Key::Unknown, Key::Named),
        WinitKey::Character(s) => Key::Character(s.to_string()),
        _ => Key::Unknown,
    }
}

/// Convert winit NamedKey to canvas-ui NamedKey; keys the editor does not
/// bind map to `None`
pub fn convert_named_key(key: &winit::keyboard::NamedKey) -> Option<NamedKey> {
    use winit::keyboard::NamedKey as WN;

    let named = match key {
        WN::Enter => NamedKey::Enter,
        WN::Escape => NamedKey::Escape,
        WN::Backspace => NamedKey::Backspace,
        WN::Delete => NamedKey::Delete,
        WN::Tab => NamedKey::Tab,
        WN::Space => NamedKey::Space,
        WN::ArrowLeft => NamedKey::ArrowLeft,
        WN::ArrowRight => NamedKey::ArrowRight,
        WN::ArrowUp => NamedKey::ArrowUp,
        WN::ArrowDown => NamedKey::ArrowDown,
        WN::Home => NamedKey::Home,
        WN::End => NamedKey::End,
        WN::PageUp => NamedKey::PageUp,
        WN::PageDown => NamedKey::PageDown,
        WN::Shift => NamedKey::Shift,
        WN::Control => NamedKey::Control,
        WN::Alt => NamedKey::Alt,
        WN::Super => NamedKey::Super,
        WN::F1 => NamedKey::F(1),
        WN::F2 => NamedKey::F(2),
        WN::F3 => NamedKey::F(3),
        WN::F4 => NamedKey::F(4),
        WN::F5 => NamedKey::F(5),
        WN::F6 => NamedKey::F(6),
        WN::F7 => NamedKey::F(7),
        WN::F8 => NamedKey::F(8),
        WN::F9 => NamedKey::F(9),
        WN::F10 => NamedKey::F(10),
        WN::F11 => NamedKey::F(11),
        WN::F12 => NamedKey::F(12),
        _ => return None,
    };
    Some(named)
}
