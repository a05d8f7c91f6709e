//! Viewport navigation: turns raw input into camera moves.

use canvas_ui::{
    InputEvent, InputEventKind, Key, MouseButton, NamedKey, Point, Rect, ScrollSource,
};
use canvas_ui_macros::Settings;
use glam::Vec3;

use crate::camera::Camera3D;

/// User preferences for viewport navigation
#[derive(Clone, Debug, PartialEq, Settings)]
pub struct NavigationPreferences {
    /// Degrees of orbit per dragged pixel
    #[settings(range(min = 0.01, max = 5.0))]
    pub orbit_sensitivity: f32,
    /// Degrees of orbit per trackpad scroll pixel
    #[settings(range(min = 0.01, max = 5.0))]
    pub trackpad_orbit_sensitivity: f32,
    /// Fractional distance change per wheel notch
    #[settings(range(min = 0.01, max = 0.9))]
    pub zoom_step: f32,
    /// Distance factor per dragged pixel when dollying
    #[settings(range(min = 1.0001, max = 1.1))]
    pub dolly_speed: f32,
    /// Orbit pivots on the selection instead of the view target
    pub orbit_around_selection: bool,
    /// Zooming keeps the point under the cursor fixed
    pub zoom_to_cursor: bool,
    /// Trackpad content follows the fingers
    pub natural_trackpad_scrolling: bool,
    pub pinch_to_zoom: bool,
    pub two_finger_rotate: bool,
    pub invert_zoom: bool,
}

impl Default for NavigationPreferences {
    fn default() -> Self {
        Self {
            orbit_sensitivity: 0.4,
            trackpad_orbit_sensitivity: 0.25,
            zoom_step: 0.1,
            dolly_speed: 1.01,
            orbit_around_selection: false,
            zoom_to_cursor: true,
            natural_trackpad_scrolling: true,
            pinch_to_zoom: true,
            two_finger_rotate: true,
            invert_zoom: false,
        }
    }
}

/// A discrete view change requested from the keyboard
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewRequest {
    /// Look down `axis` (0 = X, 1 = Y, 2 = Z) from its positive or negative side
    Axis { axis: usize, positive: bool },
    ToggleOrthographic,
    Reset,
}

impl ViewRequest {
    /// Apply the request to `camera` without animation
    pub fn apply(self, camera: &mut Camera3D) {
        match self {
            ViewRequest::Axis { axis, positive } => camera.snap_to_axis(axis, positive),
            ViewRequest::ToggleOrthographic => camera.toggle_orthographic(),
            ViewRequest::Reset => camera.reset(),
        }
    }
}

/// What a navigation step did
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NavigationResponse {
    Ignored,
    /// Consumed without moving the camera (drag start/end)
    Consumed,
    CameraMoved,
    /// A view change the host applies, possibly animated
    View(ViewRequest),
}

impl NavigationResponse {
    pub fn is_handled(&self) -> bool {
        !matches!(self, NavigationResponse::Ignored)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragMode {
    Orbit,
    Pan,
    Dolly,
}

#[derive(Clone, Copy, Debug)]
struct Drag {
    mode: DragMode,
    button: MouseButton,
    last: Point,
}

/// Maps input to camera navigation according to [`NavigationPreferences`].
///
/// The handler is stateless apart from the active drag; the camera is passed
/// in on every call so the viewport keeps ownership of it.
#[derive(Clone, Debug, Default)]
pub struct NavigationHandler {
    pub preferences: NavigationPreferences,
    drag: Option<Drag>,
    selection_center: Option<Vec3>,
}

impl NavigationHandler {
    pub fn new(preferences: NavigationPreferences) -> Self {
        Self {
            preferences: preferences.sanitized(),
            drag: None,
            selection_center: None,
        }
    }

    /// Pivot used when `orbit_around_selection` is enabled
    pub fn set_selection_center(&mut self, center: Option<Vec3>) {
        self.selection_center = center;
    }

    pub fn drag_mode(&self) -> Option<DragMode> {
        self.drag.map(|d| d.mode)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    pub fn handle_event(
        &mut self,
        camera: &mut Camera3D,
        event: &InputEvent,
        viewport: &Rect,
    ) -> NavigationResponse {
        match event.kind {
            InputEventKind::MousePress => self.on_press(camera, event, viewport),
            InputEventKind::MouseMove => self.on_move(camera, event, viewport),
            InputEventKind::MouseRelease => match self.drag {
                Some(drag) if Some(drag.button) == event.button => {
                    self.drag = None;
                    NavigationResponse::Consumed
                }
                _ => NavigationResponse::Ignored,
            },
            InputEventKind::MouseWheel => {
                if !viewport.contains(event.position) {
                    return NavigationResponse::Ignored;
                }
                match event.resolved_scroll_source() {
                    ScrollSource::Trackpad => self.on_trackpad_pan(camera, event, viewport),
                    _ => {
                        let notches = if self.preferences.invert_zoom {
                            -event.delta.y
                        } else {
                            event.delta.y
                        };
                        let factor = (1.0 - self.preferences.zoom_step).powf(notches);
                        self.zoom(camera, factor, event.position, viewport)
                    }
                }
            }
            InputEventKind::TrackpadPan => {
                if !viewport.contains(event.position) {
                    return NavigationResponse::Ignored;
                }
                self.on_trackpad_pan(camera, event, viewport)
            }
            InputEventKind::TrackpadZoom => {
                if !self.preferences.pinch_to_zoom || !viewport.contains(event.position) {
                    return NavigationResponse::Ignored;
                }
                let magnification = event.delta.y.clamp(-0.9, 10.0);
                self.zoom(camera, 1.0 / (1.0 + magnification), event.position, viewport)
            }
            InputEventKind::TrackpadRotate => {
                if !self.preferences.two_finger_rotate || !viewport.contains(event.position) {
                    return NavigationResponse::Ignored;
                }
                camera.orbit(event.delta.x, 0.0);
                NavigationResponse::CameraMoved
            }
            InputEventKind::KeyPress => match Self::view_shortcut(event) {
                Some(request) => NavigationResponse::View(request),
                None => NavigationResponse::Ignored,
            },
            InputEventKind::KeyRelease => NavigationResponse::Ignored,
        }
    }

    fn on_press(
        &mut self,
        camera: &mut Camera3D,
        event: &InputEvent,
        viewport: &Rect,
    ) -> NavigationResponse {
        if self.drag.is_some() || !viewport.contains(event.position) {
            return NavigationResponse::Ignored;
        }
        let Some(button) = event.button else {
            return NavigationResponse::Ignored;
        };
        let mods = event.modifiers;
        let mode = match button {
            MouseButton::Middle if mods.shift => DragMode::Pan,
            MouseButton::Middle if mods.ctrl => DragMode::Dolly,
            MouseButton::Middle => DragMode::Orbit,
            MouseButton::Left if mods.alt && mods.shift => DragMode::Pan,
            MouseButton::Left if mods.alt && mods.ctrl => DragMode::Dolly,
            MouseButton::Left if mods.alt => DragMode::Orbit,
            _ => return NavigationResponse::Ignored,
        };

        if mode == DragMode::Orbit && self.preferences.orbit_around_selection {
            if let Some(center) = self.selection_center {
                camera.retarget(center);
            }
        }

        log::trace!("navigation drag start: {mode:?}");
        self.drag = Some(Drag {
            mode,
            button,
            last: event.position,
        });
        NavigationResponse::Consumed
    }

    fn on_move(
        &mut self,
        camera: &mut Camera3D,
        event: &InputEvent,
        viewport: &Rect,
    ) -> NavigationResponse {
        let Some(drag) = self.drag.as_mut() else {
            return NavigationResponse::Ignored;
        };
        let dx = event.position.x - drag.last.x;
        let dy = event.position.y - drag.last.y;
        drag.last = event.position;
        if dx == 0.0 && dy == 0.0 {
            return NavigationResponse::Consumed;
        }

        match drag.mode {
            DragMode::Orbit => {
                let s = self.preferences.orbit_sensitivity;
                camera.orbit(-dx * s, -dy * s);
            }
            DragMode::Pan => camera.pan(dx, dy, viewport.height()),
            DragMode::Dolly => {
                camera.zoom(self.preferences.dolly_speed.powf(dy));
            }
        }
        NavigationResponse::CameraMoved
    }

    fn on_trackpad_pan(
        &mut self,
        camera: &mut Camera3D,
        event: &InputEvent,
        viewport: &Rect,
    ) -> NavigationResponse {
        let sign = if self.preferences.natural_trackpad_scrolling {
            1.0
        } else {
            -1.0
        };
        let dx = event.delta.x * sign;
        let dy = event.delta.y * sign;

        if event.modifiers.ctrl {
            // Ctrl+scroll on a trackpad is the conventional pinch fallback
            let factor = (1.0 - self.preferences.zoom_step * 0.1).powf(dy);
            return self.zoom(camera, factor, event.position, viewport);
        }
        if event.modifiers.shift {
            camera.pan(dx, dy, viewport.height());
        } else {
            let s = self.preferences.trackpad_orbit_sensitivity;
            camera.orbit(-dx * s, -dy * s);
        }
        NavigationResponse::CameraMoved
    }

    fn zoom(
        &self,
        camera: &mut Camera3D,
        factor: f32,
        cursor: Point,
        viewport: &Rect,
    ) -> NavigationResponse {
        if !factor.is_finite() || factor == 1.0 {
            return NavigationResponse::Consumed;
        }
        if self.preferences.zoom_to_cursor {
            let ray = camera.screen_ray(cursor, viewport);
            if let Some(t) = ray.intersect_plane(camera.target, camera.forward()) {
                camera.zoom_towards(factor, ray.at(t));
                return NavigationResponse::CameraMoved;
            }
        }
        camera.zoom(factor);
        NavigationResponse::CameraMoved
    }

    /// Keyboard view shortcuts: 1/3/7 front/right/top (Ctrl for the opposite
    /// side), 5 toggles orthographic, Home resets.
    pub fn view_shortcut(event: &InputEvent) -> Option<ViewRequest> {
        if event.kind != InputEventKind::KeyPress {
            return None;
        }
        let positive = !event.modifiers.ctrl;
        match event.key.as_ref()? {
            Key::Named(NamedKey::Home) => Some(ViewRequest::Reset),
            Key::Character(c) => match c.as_str() {
                "1" => Some(ViewRequest::Axis { axis: 2, positive }),
                "3" => Some(ViewRequest::Axis { axis: 0, positive }),
                "7" => Some(ViewRequest::Axis { axis: 1, positive }),
                "5" => Some(ViewRequest::ToggleOrthographic),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_ui::Modifiers;

    fn viewport() -> Rect {
        Rect::new([0.0, 0.0], [800.0, 600.0])
    }

    fn drag(handler: &mut NavigationHandler, camera: &mut Camera3D, button: MouseButton, mods: Modifiers) {
        let start = Point::new(400.0, 300.0);
        let press = InputEvent::mouse_press(start, button).with_modifiers(mods);
        assert!(handler.handle_event(camera, &press, &viewport()).is_handled());
        let motion = InputEvent::mouse_move(Point::new(450.0, 320.0), Point::new(50.0, 20.0));
        assert_eq!(
            handler.handle_event(camera, &motion, &viewport()),
            NavigationResponse::CameraMoved
        );
        let release = InputEvent::mouse_release(Point::new(450.0, 320.0), button);
        assert_eq!(
            handler.handle_event(camera, &release, &viewport()),
            NavigationResponse::Consumed
        );
        assert!(!handler.is_dragging());
    }

    #[test]
    fn test_middle_drag_orbits() {
        let mut handler = NavigationHandler::default();
        let mut camera = Camera3D::default();
        let yaw = camera.yaw();
        drag(&mut handler, &mut camera, MouseButton::Middle, Modifiers::NONE);
        assert!((camera.yaw() - yaw).abs() > 1.0);
        assert_eq!(camera.target, Vec3::ZERO);
    }

    #[test]
    fn test_shift_middle_drag_pans() {
        let mut handler = NavigationHandler::default();
        let mut camera = Camera3D::default();
        let rotation = camera.rotation;
        let shift = Modifiers { shift: true, ..Modifiers::NONE };
        drag(&mut handler, &mut camera, MouseButton::Middle, shift);
        assert_ne!(camera.target, Vec3::ZERO);
        assert_eq!(camera.rotation, rotation);
    }

    #[test]
    fn test_ctrl_middle_drag_dollies() {
        let mut handler = NavigationHandler::default();
        let mut camera = Camera3D::default();
        let ctrl = Modifiers { ctrl: true, ..Modifiers::NONE };
        drag(&mut handler, &mut camera, MouseButton::Middle, ctrl);
        assert!(camera.distance > 10.0);
    }

    #[test]
    fn test_plain_left_press_is_ignored() {
        let mut handler = NavigationHandler::default();
        let mut camera = Camera3D::default();
        let press = InputEvent::mouse_press(Point::new(10.0, 10.0), MouseButton::Left);
        assert_eq!(
            handler.handle_event(&mut camera, &press, &viewport()),
            NavigationResponse::Ignored
        );
    }

    #[test]
    fn test_wheel_zooms_in_and_out() {
        let mut handler = NavigationHandler::new(
            NavigationPreferences::default().with_zoom_to_cursor(false),
        );
        let mut camera = Camera3D::default();
        let up = InputEvent::wheel(Point::new(400.0, 300.0), Point::new(0.0, 1.0), ScrollSource::Wheel);
        handler.handle_event(&mut camera, &up, &viewport());
        assert!((camera.distance - 9.0).abs() < 1e-4);

        let down = InputEvent::wheel(Point::new(400.0, 300.0), Point::new(0.0, -1.0), ScrollSource::Wheel);
        handler.handle_event(&mut camera, &down, &viewport());
        assert!((camera.distance - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_trackpad_scroll_orbits_not_zooms() {
        let mut handler = NavigationHandler::default();
        let mut camera = Camera3D::default();
        let scroll = InputEvent::wheel(Point::new(400.0, 300.0), Point::new(12.5, 0.0), ScrollSource::Trackpad);
        assert_eq!(
            handler.handle_event(&mut camera, &scroll, &viewport()),
            NavigationResponse::CameraMoved
        );
        assert_eq!(camera.distance, 10.0);
    }

    #[test]
    fn test_pinch_respects_preference() {
        let mut camera = Camera3D::default();
        let pinch = InputEvent::trackpad_zoom(Point::new(400.0, 300.0), 0.25);

        let mut disabled = NavigationHandler::new(NavigationPreferences::default().with_pinch_to_zoom(false));
        assert!(!disabled.handle_event(&mut camera, &pinch, &viewport()).is_handled());

        let mut enabled = NavigationHandler::default();
        enabled.handle_event(&mut camera, &pinch, &viewport());
        assert!(camera.distance < 10.0);
    }

    #[test]
    fn test_view_shortcuts() {
        let at = Point::new(0.0, 0.0);
        let one = InputEvent::key_press(at, Key::character('1'));
        assert_eq!(
            NavigationHandler::view_shortcut(&one),
            Some(ViewRequest::Axis { axis: 2, positive: true })
        );
        let ctrl_seven = InputEvent::key_press(at, Key::character('7'))
            .with_modifiers(Modifiers { ctrl: true, ..Modifiers::NONE });
        assert_eq!(
            NavigationHandler::view_shortcut(&ctrl_seven),
            Some(ViewRequest::Axis { axis: 1, positive: false })
        );
        let home = InputEvent::key_press(at, Key::Named(NamedKey::Home));
        assert_eq!(NavigationHandler::view_shortcut(&home), Some(ViewRequest::Reset));
    }

    #[test]
    fn test_orbit_around_selection_retargets() {
        let mut handler =
            NavigationHandler::new(NavigationPreferences::default().with_orbit_around_selection(true));
        handler.set_selection_center(Some(Vec3::new(2.0, 0.0, 1.0)));
        let mut camera = Camera3D::default();
        let press = InputEvent::mouse_press(Point::new(400.0, 300.0), MouseButton::Middle);
        handler.handle_event(&mut camera, &press, &viewport());
        assert_eq!(camera.target, Vec3::new(2.0, 0.0, 1.0));
    }
}
