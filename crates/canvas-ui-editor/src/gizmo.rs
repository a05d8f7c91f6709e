//! Orientation gizmo drawn in the corner of the 3D viewport.
//!
//! Six axis endpoints (+X, -X, +Y, -Y, +Z, -Z) are placed with the camera's
//! rotation only, so the gizmo turns with the view but never moves or scales.
//! Endpoints are painted back-to-front and hit-tested front-to-back.
//! Positive endpoints are filled discs joined to the centre by a line, negative
//! endpoints are hollow rings. Clicking an endpoint reports `(axis, positive)`;
//! dragging anywhere else on the gizmo orbits the camera.

use canvas_ui::{
    Color, InputEvent, InputEventKind, Layer, MouseButton, Point, Rect, Renderer, TextStyle, Theme,
};
use canvas_ui_macros::Settings;
use glam::Vec3;

use crate::camera::Camera3D;

const AXIS_LABELS: [&str; 3] = ["X", "Y", "Z"];

#[derive(Clone, Debug, PartialEq, Settings)]
pub struct GizmoStyle {
    /// Distance from the gizmo centre to each endpoint
    #[settings(range(min = 16.0, max = 200.0))]
    pub radius: f32,
    /// Radius of the positive-axis discs
    #[settings(range(min = 2.0, max = 40.0))]
    pub sphere_radius: f32,
    /// Radius of the negative-axis rings
    #[settings(range(min = 2.0, max = 40.0))]
    pub negative_radius: f32,
    pub ring_thickness: f32,
    pub line_width: f32,
    /// Gap between the gizmo and the viewport's top-right corner
    pub margin: f32,
    /// Degrees of orbit per pixel when dragging the gizmo
    pub drag_sensitivity: f32,
    pub show_labels: bool,
}

impl Default for GizmoStyle {
    fn default() -> Self {
        Self {
            radius: 42.0,
            sphere_radius: 9.0,
            negative_radius: 7.0,
            ring_thickness: 1.5,
            line_width: 2.0,
            margin: 14.0,
            drag_sensitivity: 0.5,
            show_labels: true,
        }
    }
}

/// One projected endpoint
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisEndpoint {
    /// 0 = X, 1 = Y, 2 = Z
    pub axis: usize,
    pub positive: bool,
    pub screen: Point,
    /// Relative depth among the six endpoints in [-1, 1]; lower is farther
    pub depth: f32,
    pub radius: f32,
}

/// Linearly map `values` onto [-1, 1]. Equal values map to 0.
pub fn normalize_depths(values: &mut [f32]) {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    for value in values.iter_mut() {
        *value = if range > 1e-6 {
            (*value - min) / range * 2.0 - 1.0
        } else {
            0.0
        };
    }
}

pub struct NavigationGizmo {
    pub style: GizmoStyle,
    center: Point,
    /// Sorted back-to-front
    endpoints: Vec<AxisEndpoint>,
    hovered: Option<(usize, bool)>,
    pressed: Option<(usize, bool)>,
    drag_last: Option<Point>,
    on_axis_click: Option<Box<dyn FnMut(usize, bool)>>,
}

impl Default for NavigationGizmo {
    fn default() -> Self {
        Self::new(GizmoStyle::default())
    }
}

impl NavigationGizmo {
    pub fn new(style: GizmoStyle) -> Self {
        Self {
            style: style.sanitized(),
            center: Point::zero(),
            endpoints: Vec::with_capacity(6),
            hovered: None,
            pressed: None,
            drag_last: None,
            on_axis_click: None,
        }
    }

    /// Callback receiving `(axis, positive)` when an endpoint is clicked
    pub fn on_axis_click(mut self, f: impl FnMut(usize, bool) + 'static) -> Self {
        self.on_axis_click = Some(Box::new(f));
        self
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn endpoints(&self) -> &[AxisEndpoint] {
        &self.endpoints
    }

    pub fn hovered(&self) -> Option<(usize, bool)> {
        self.hovered
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_last.is_some()
    }

    /// Circle enclosing the whole gizmo
    pub fn outer_radius(&self) -> f32 {
        self.style.radius + self.style.sphere_radius + 4.0
    }

    pub fn contains(&self, point: Point) -> bool {
        point.distance(self.center) <= self.outer_radius()
    }

    /// Recompute endpoint positions and depth order for `camera`
    pub fn layout(&mut self, camera: &Camera3D, viewport: &Rect) {
        let offset = self.style.margin + self.outer_radius();
        self.center = Point::new(viewport.max[0] - offset, viewport.min[1] + offset);

        let view_rotation = camera.rotation.conjugate();
        let view = camera.view_matrix();

        let mut projected = Vec::with_capacity(6);
        let mut depths = Vec::with_capacity(6);
        for axis in 0..3 {
            for positive in [true, false] {
                let mut dir = Vec3::ZERO;
                dir[axis] = if positive { 1.0 } else { -1.0 };

                let local = view_rotation * dir;
                let screen = Point::new(
                    self.center.x + local.x * self.style.radius,
                    self.center.y - local.y * self.style.radius,
                );
                depths.push((view * (camera.target + dir).extend(1.0)).z);
                projected.push((axis, positive, screen));
            }
        }
        normalize_depths(&mut depths);

        self.endpoints = projected
            .into_iter()
            .zip(depths)
            .map(|((axis, positive, screen), depth)| AxisEndpoint {
                axis,
                positive,
                screen,
                depth,
                radius: if positive {
                    self.style.sphere_radius
                } else {
                    self.style.negative_radius
                },
            })
            .collect();
        self.endpoints.sort_by(|a, b| a.depth.total_cmp(&b.depth));
    }

    /// Frontmost endpoint whose disc contains `point`
    pub fn hit_test(&self, point: Point) -> Option<(usize, bool)> {
        self.endpoints
            .iter()
            .rev()
            .find(|e| point.distance(e.screen) <= e.radius)
            .map(|e| (e.axis, e.positive))
    }

    /// Returns true when the event was consumed. Drags orbit `camera`.
    pub fn handle_event(&mut self, event: &InputEvent, camera: &mut Camera3D) -> bool {
        match event.kind {
            InputEventKind::MouseMove => {
                if let Some(last) = self.drag_last {
                    let s = self.style.drag_sensitivity;
                    camera.orbit(-(event.position.x - last.x) * s, -(event.position.y - last.y) * s);
                    self.drag_last = Some(event.position);
                    return true;
                }
                self.hovered = self.hit_test(event.position);
                false
            }
            InputEventKind::MousePress if event.button == Some(MouseButton::Left) => {
                if !self.contains(event.position) {
                    return false;
                }
                match self.hit_test(event.position) {
                    Some(hit) => self.pressed = Some(hit),
                    None => self.drag_last = Some(event.position),
                }
                true
            }
            InputEventKind::MouseRelease if event.button == Some(MouseButton::Left) => {
                let was_active = self.pressed.is_some() || self.drag_last.is_some();
                self.drag_last = None;
                if let Some(pressed) = self.pressed.take() {
                    if self.hit_test(event.position) == Some(pressed) {
                        log::debug!("gizmo axis click: {:?}", pressed);
                        if let Some(ref mut on_axis_click) = self.on_axis_click {
                            on_axis_click(pressed.0, pressed.1);
                        }
                    }
                }
                was_active
            }
            _ => false,
        }
    }

    pub fn render(&self, renderer: &mut Renderer, theme: &Theme) {
        let style = &self.style;
        renderer.with_layer(Layer::Overlay, |renderer| {
            if self.hovered.is_some() || self.is_dragging() {
                renderer.draw_circle(
                    self.center,
                    self.outer_radius(),
                    theme.hover_background.with_alpha(theme.hover_background_alpha),
                );
            }

            let label_style = TextStyle::sized(style.sphere_radius * 1.2).bold();
            for endpoint in &self.endpoints {
                let axis_color = theme.axis_color(endpoint.axis);
                let hovered = self.hovered == Some((endpoint.axis, endpoint.positive));

                if endpoint.positive {
                    renderer.draw_line_batched(
                        self.center,
                        endpoint.screen,
                        style.line_width,
                        axis_color.with_alpha(theme.line_alpha),
                    );
                    let stroke = hovered.then_some((1.5, Color::WHITE));
                    renderer.draw_circle_with_stroke(
                        endpoint.screen,
                        endpoint.radius,
                        axis_color.with_alpha(theme.positive_sphere_alpha),
                        stroke,
                    );
                    if style.show_labels {
                        draw_label(
                            renderer,
                            AXIS_LABELS[endpoint.axis],
                            endpoint.screen,
                            &label_style,
                            theme.background,
                        );
                    }
                } else {
                    let fill = theme
                        .background
                        .lerp(&axis_color, 0.25)
                        .with_alpha(theme.negative_fill_alpha);
                    let ring = if hovered {
                        Color::WHITE
                    } else {
                        axis_color.with_alpha(theme.negative_ring_alpha)
                    };
                    renderer.draw_circle_with_stroke(
                        endpoint.screen,
                        endpoint.radius,
                        fill,
                        Some((style.ring_thickness, ring)),
                    );
                }
            }
        });
    }
}

fn draw_label(renderer: &mut Renderer, text: &str, center: Point, style: &TextStyle, color: Color) {
    let Some([w, h]) = renderer.measure_text(text, style) else {
        return;
    };
    renderer.draw_text(text, Point::new(center.x - w * 0.5, center.y - h * 0.5), style, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn viewport() -> Rect {
        Rect::new([0.0, 0.0], [800.0, 600.0])
    }

    fn laid_out(camera: &Camera3D) -> NavigationGizmo {
        let mut gizmo = NavigationGizmo::default();
        gizmo.layout(camera, &viewport());
        gizmo
    }

    #[test]
    fn test_depths_normalized_and_sorted() {
        let gizmo = laid_out(&Camera3D::default());
        let depths: Vec<f32> = gizmo.endpoints().iter().map(|e| e.depth).collect();
        assert_eq!(depths.len(), 6);
        assert!(depths.windows(2).all(|w| w[0] <= w[1]));
        assert!((depths[0] + 1.0).abs() < 1e-5);
        assert!((depths[5] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_front_axis_is_last() {
        // Default camera sits at +X +Y +Z looking at the origin
        let gizmo = laid_out(&Camera3D::default());
        let front = gizmo.endpoints().last().unwrap();
        assert!(front.positive);
    }

    #[test]
    fn test_normalize_equal_values() {
        let mut values = [3.0, 3.0, 3.0];
        normalize_depths(&mut values);
        assert_eq!(values, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_click_reports_axis() {
        let clicked = Rc::new(Cell::new(None));
        let sink = clicked.clone();
        let mut camera = Camera3D::default();
        let mut gizmo = NavigationGizmo::default()
            .on_axis_click(move |axis, positive| sink.set(Some((axis, positive))));
        gizmo.layout(&camera, &viewport());

        let target = *gizmo.endpoints().last().unwrap();
        assert!(gizmo.handle_event(&InputEvent::mouse_press(target.screen, MouseButton::Left), &mut camera));
        assert!(gizmo.handle_event(&InputEvent::mouse_release(target.screen, MouseButton::Left), &mut camera));
        assert_eq!(clicked.get(), Some((target.axis, target.positive)));
    }

    #[test]
    fn test_press_outside_is_ignored() {
        let mut camera = Camera3D::default();
        let mut gizmo = laid_out(&camera);
        let press = InputEvent::mouse_press(Point::new(10.0, 500.0), MouseButton::Left);
        assert!(!gizmo.handle_event(&press, &mut camera));
    }

    #[test]
    fn test_drag_on_disc_orbits() {
        let mut camera = Camera3D::default();
        let mut gizmo = laid_out(&camera);
        let rotation = camera.rotation;
        // The centre is covered by no endpoint disc when viewed obliquely
        let start = gizmo.center();
        assert_eq!(gizmo.hit_test(start), None);
        gizmo.handle_event(&InputEvent::mouse_press(start, MouseButton::Left), &mut camera);
        assert!(gizmo.is_dragging());
        let moved = Point::new(start.x + 10.0, start.y);
        assert!(gizmo.handle_event(&InputEvent::mouse_move(moved, Point::new(10.0, 0.0)), &mut camera));
        assert_ne!(camera.rotation, rotation);
    }

    #[test]
    fn test_top_view_puts_y_in_front() {
        let mut camera = Camera3D::default();
        camera.snap_to_axis(1, true);
        let gizmo = laid_out(&camera);
        let front = gizmo.endpoints().last().unwrap();
        assert_eq!((front.axis, front.positive), (1, true));
        assert!(front.screen.distance(gizmo.center()) < 1e-3);
    }
}
