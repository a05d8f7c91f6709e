//! The 3D viewport editor: grid, orientation gizmo and camera navigation
//! sharing one [`Camera3D`].

use std::cell::Cell;
use std::rc::Rc;

use canvas_ui::{InputEvent, Point, Rect, Renderer, TextStyle, Theme};
use glam::Quat;

use crate::camera::Camera3D;
use crate::gizmo::NavigationGizmo;
use crate::grid::GridRenderer;
use crate::navigation::{NavigationHandler, NavigationPreferences, NavigationResponse, ViewRequest};

/// Seconds an axis snap takes to rotate into place
pub const SNAP_DURATION: f32 = 0.25;

#[derive(Clone, Copy, Debug)]
struct SnapAnimation {
    from: Quat,
    to: Quat,
    elapsed: f32,
}

pub struct Viewport3DEditor {
    pub camera: Camera3D,
    pub navigation: NavigationHandler,
    pub grid: GridRenderer,
    pub show_grid: bool,
    pub show_gizmo: bool,
    gizmo: NavigationGizmo,
    axis_clicks: Rc<Cell<Option<(usize, bool)>>>,
    snap: Option<SnapAnimation>,
}

impl Default for Viewport3DEditor {
    fn default() -> Self {
        Self::new(NavigationPreferences::default())
    }
}

impl Viewport3DEditor {
    pub fn new(preferences: NavigationPreferences) -> Self {
        let axis_clicks = Rc::new(Cell::new(None));
        let sink = axis_clicks.clone();
        Self {
            camera: Camera3D::default(),
            navigation: NavigationHandler::new(preferences),
            grid: GridRenderer::default(),
            show_grid: true,
            show_gizmo: true,
            gizmo: NavigationGizmo::default()
                .on_axis_click(move |axis, positive| sink.set(Some((axis, positive)))),
            axis_clicks,
            snap: None,
        }
    }

    pub fn gizmo(&self) -> &NavigationGizmo {
        &self.gizmo
    }

    pub fn is_animating(&self) -> bool {
        self.snap.is_some()
    }

    /// Rotate to look down an axis over [`SNAP_DURATION`], ending orthographic
    pub fn snap_to_axis_animated(&mut self, axis: usize, positive: bool) {
        log::debug!("viewport snap to axis {axis} (positive: {positive})");
        self.snap = Some(SnapAnimation {
            from: self.camera.rotation,
            to: Camera3D::axis_rotation(axis, positive),
            elapsed: 0.0,
        });
        self.camera.set_orthographic(true);
    }

    fn apply_view(&mut self, request: ViewRequest) {
        match request {
            ViewRequest::Axis { axis, positive } => self.snap_to_axis_animated(axis, positive),
            other => {
                self.snap = None;
                other.apply(&mut self.camera);
            }
        }
    }

    fn layout_gizmo(&mut self, bounds: &Rect) {
        self.gizmo.layout(&self.camera, bounds);
    }

    /// Returns true when the event was consumed or changed what is drawn
    pub fn handle_event(&mut self, event: &InputEvent, bounds: &Rect) -> bool {
        if self.show_gizmo {
            self.layout_gizmo(bounds);
            let hovered = self.gizmo.hovered();
            let consumed = self.gizmo.handle_event(event, &mut self.camera);
            if let Some((axis, positive)) = self.axis_clicks.take() {
                self.snap_to_axis_animated(axis, positive);
                return true;
            }
            if consumed {
                // A gizmo drag overrides any running snap
                if self.gizmo.is_dragging() {
                    self.snap = None;
                }
                return true;
            }
            if self.gizmo.hovered() != hovered {
                return true;
            }
        }

        match self.navigation.handle_event(&mut self.camera, event, bounds) {
            NavigationResponse::Ignored => false,
            NavigationResponse::Consumed => true,
            NavigationResponse::CameraMoved => {
                self.snap = None;
                true
            }
            NavigationResponse::View(request) => {
                self.apply_view(request);
                true
            }
        }
    }

    /// Advance the snap animation; returns true while the camera is still moving
    pub fn update(&mut self, dt: f32) -> bool {
        let Some(snap) = self.snap.as_mut() else {
            return false;
        };
        snap.elapsed += dt.max(0.0);
        let t = (snap.elapsed / SNAP_DURATION).min(1.0);
        let eased = t * t * (3.0 - 2.0 * t);
        self.camera.rotation = snap.from.slerp(snap.to, eased).normalize();
        if t >= 1.0 {
            self.camera.rotation = snap.to;
            self.snap = None;
        }
        true
    }

    /// Background and grid. There is no depth buffer; the grid is painted
    /// first and everything after it sits on top.
    pub fn render(&mut self, renderer: &mut Renderer, theme: &Theme, bounds: &Rect) {
        renderer.draw_rect(*bounds, theme.viewport_background);
        if self.show_grid {
            self.grid.render(renderer, theme, &self.camera, bounds);
        }
    }

    /// Gizmo and view label, drawn after the region's widgets
    pub fn render_overlay(&mut self, renderer: &mut Renderer, theme: &Theme, bounds: &Rect) {
        if self.show_gizmo {
            self.layout_gizmo(bounds);
            renderer.with_clip(*bounds, |renderer| self.gizmo.render(renderer, theme));
        }

        let label = if self.camera.orthographic {
            "User Orthographic"
        } else {
            "User Perspective"
        };
        renderer.draw_text(
            label,
            Point::new(bounds.min[0] + 8.0, bounds.min[1] + 6.0),
            &TextStyle::sized(12.0),
            theme.text_secondary,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_ui::{Key, MouseButton};
    use glam::Vec3;

    fn bounds() -> Rect {
        Rect::new([0.0, 0.0], [800.0, 600.0])
    }

    #[test]
    fn test_gizmo_click_starts_snap() {
        let mut viewport = Viewport3DEditor::default();
        viewport.layout_gizmo(&bounds());
        let front = *viewport.gizmo().endpoints().last().unwrap();

        viewport.handle_event(&InputEvent::mouse_press(front.screen, MouseButton::Left), &bounds());
        assert!(viewport.handle_event(&InputEvent::mouse_release(front.screen, MouseButton::Left), &bounds()));
        assert!(viewport.is_animating());
        assert!(viewport.camera.orthographic);

        while viewport.update(0.05) {}
        let expected = Camera3D::axis_rotation(front.axis, front.positive);
        assert!(viewport.camera.rotation.abs_diff_eq(expected, 1e-5));
        assert!(!viewport.is_animating());
    }

    #[test]
    fn test_key_shortcut_snaps_top() {
        let mut viewport = Viewport3DEditor::default();
        let seven = InputEvent::key_press(Point::new(100.0, 100.0), Key::character('7'));
        assert!(viewport.handle_event(&seven, &bounds()));
        viewport.update(1.0);
        assert!((viewport.camera.forward() - Vec3::NEG_Y).length() < 1e-4);
    }

    #[test]
    fn test_navigation_cancels_snap() {
        let mut viewport = Viewport3DEditor::default();
        viewport.snap_to_axis_animated(0, true);
        let press = InputEvent::mouse_press(Point::new(100.0, 400.0), MouseButton::Middle);
        viewport.handle_event(&press, &bounds());
        let motion = InputEvent::mouse_move(Point::new(140.0, 400.0), Point::new(40.0, 0.0));
        assert!(viewport.handle_event(&motion, &bounds()));
        assert!(!viewport.is_animating());
    }

    #[test]
    fn test_unrelated_event_not_handled() {
        let mut viewport = Viewport3DEditor::default();
        let press = InputEvent::mouse_press(Point::new(100.0, 400.0), MouseButton::Right);
        assert!(!viewport.handle_event(&press, &bounds()));
    }
}
