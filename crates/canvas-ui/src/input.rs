//! Backend-agnostic input event descriptor
//!
//! The platform layer converts its native events into [`InputEvent`]s; nothing
//! in the core depends on a windowing library.

use crate::Point;

/// Backend-agnostic mouse button representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    /// Additional mouse buttons (back, forward, etc.)
    Other(u8),
}

/// Backend-agnostic named key representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Enter,
    Escape,
    Backspace,
    Delete,
    Tab,
    Space,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    PageUp,
    PageDown,
    Shift,
    Control,
    Alt,
    Super,
    /// Function keys F1-F12
    F(u8),
}

/// Backend-agnostic key representation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Named(NamedKey),
    /// A character key (letters, numbers, symbols)
    Character(String),
    Unknown,
}

impl Key {
    pub fn character(c: char) -> Self {
        Key::Character(c.to_string())
    }

    /// True if this is the character key `c` (case-insensitive)
    pub fn is_char(&self, c: char) -> bool {
        match self {
            Key::Character(s) => {
                let mut chars = s.chars();
                matches!((chars.next(), chars.next()), (Some(k), None) if k.eq_ignore_ascii_case(&c))
            }
            _ => false,
        }
    }
}

/// Modifier keys held while an event was generated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub super_key: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        super_key: false,
    };

    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.super_key
    }
}

/// Kind of input event delivered by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEventKind {
    MousePress,
    MouseRelease,
    MouseMove,
    MouseWheel,
    /// Two-finger scroll on a trackpad
    TrackpadPan,
    /// Pinch gesture; `delta.y` carries the magnification delta
    TrackpadZoom,
    /// Rotation gesture; `delta.x` carries the angle delta in degrees
    TrackpadRotate,
    KeyPress,
    KeyRelease,
}

/// Device that produced a scroll, as reported by the platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScrollSource {
    Wheel,
    Trackpad,
    /// The platform gave no device signal
    #[default]
    Unknown,
}

/// Normalized input-event descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    pub kind: InputEventKind,
    /// Cursor position in window coordinates
    pub position: Point,
    /// Movement or scroll delta, meaning depends on `kind`
    pub delta: Point,
    pub button: Option<MouseButton>,
    pub key: Option<Key>,
    pub modifiers: Modifiers,
    /// Seconds since an arbitrary platform epoch
    pub timestamp: f64,
    pub scroll_source: ScrollSource,
}

impl InputEvent {
    fn base(kind: InputEventKind, position: Point) -> Self {
        Self {
            kind,
            position,
            delta: Point::zero(),
            button: None,
            key: None,
            modifiers: Modifiers::NONE,
            timestamp: 0.0,
            scroll_source: ScrollSource::Unknown,
        }
    }

    pub fn mouse_press(position: Point, button: MouseButton) -> Self {
        Self {
            button: Some(button),
            ..Self::base(InputEventKind::MousePress, position)
        }
    }

    pub fn mouse_release(position: Point, button: MouseButton) -> Self {
        Self {
            button: Some(button),
            ..Self::base(InputEventKind::MouseRelease, position)
        }
    }

    pub fn mouse_move(position: Point, delta: Point) -> Self {
        Self {
            delta,
            ..Self::base(InputEventKind::MouseMove, position)
        }
    }

    pub fn wheel(position: Point, delta: Point, source: ScrollSource) -> Self {
        Self {
            delta,
            scroll_source: source,
            ..Self::base(InputEventKind::MouseWheel, position)
        }
    }

    pub fn trackpad_pan(position: Point, delta: Point) -> Self {
        Self {
            delta,
            scroll_source: ScrollSource::Trackpad,
            ..Self::base(InputEventKind::TrackpadPan, position)
        }
    }

    pub fn trackpad_zoom(position: Point, magnification: f32) -> Self {
        Self {
            delta: Point::new(0.0, magnification),
            scroll_source: ScrollSource::Trackpad,
            ..Self::base(InputEventKind::TrackpadZoom, position)
        }
    }

    pub fn trackpad_rotate(position: Point, degrees: f32) -> Self {
        Self {
            delta: Point::new(degrees, 0.0),
            scroll_source: ScrollSource::Trackpad,
            ..Self::base(InputEventKind::TrackpadRotate, position)
        }
    }

    pub fn key_press(position: Point, key: Key) -> Self {
        Self {
            key: Some(key),
            ..Self::base(InputEventKind::KeyPress, position)
        }
    }

    pub fn key_release(position: Point, key: Key) -> Self {
        Self {
            key: Some(key),
            ..Self::base(InputEventKind::KeyRelease, position)
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Events that carry a meaningful pointer position for hit-testing
    pub fn is_pointer(&self) -> bool {
        !matches!(
            self.kind,
            InputEventKind::KeyPress | InputEventKind::KeyRelease
        )
    }

    pub fn is_press_of(&self, button: MouseButton) -> bool {
        self.kind == InputEventKind::MousePress && self.button == Some(button)
    }

    pub fn is_release_of(&self, button: MouseButton) -> bool {
        self.kind == InputEventKind::MouseRelease && self.button == Some(button)
    }

    pub fn is_named_key_press(&self, named: NamedKey) -> bool {
        self.kind == InputEventKind::KeyPress && self.key == Some(Key::Named(named))
    }

    /// Resolve the scroll device for wheel events.
    ///
    /// The platform signal is authoritative. Only when it is `Unknown` does
    /// the delta heuristic apply: notched wheels report whole-step vertical
    /// deltas with no horizontal component, anything else is treated as a
    /// trackpad. The heuristic misclassifies smart mice that emit fractional
    /// deltas.
    pub fn resolved_scroll_source(&self) -> ScrollSource {
        match self.scroll_source {
            ScrollSource::Unknown => {
                let whole_step = self.delta.y != 0.0 && self.delta.y.fract() == 0.0;
                if whole_step && self.delta.x == 0.0 {
                    ScrollSource::Wheel
                } else {
                    ScrollSource::Trackpad
                }
            }
            known => known,
        }
    }
}
