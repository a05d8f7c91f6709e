//! Orbit camera for the 3D viewport.
//!
//! World space is Y-up with the ground grid on the XZ plane. The camera orbits
//! `target` at `distance`; its orientation is a quaternion so orbiting past the
//! poles never locks. Pitch and yaw are derived for display only.

use canvas_ui::{Point, Rect};
use glam::{Mat4, Quat, Vec3};

pub const DEFAULT_DISTANCE: f32 = 10.0;
pub const DEFAULT_YAW_DEGREES: f32 = 45.0;
pub const DEFAULT_PITCH_DEGREES: f32 = -30.0;

/// A ray in world space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
}

impl Ray {
    /// Parameter `t` where the ray meets the plane, if it does in front of the origin
    pub fn intersect_plane(&self, point: Vec3, normal: Vec3) -> Option<f32> {
        let denom = self.direction.dot(normal);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = (point - self.origin).dot(normal) / denom;
        (t >= 0.0).then_some(t)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Camera3D {
    /// Camera-to-world rotation; the camera looks down its local -Z
    pub rotation: Quat,
    pub distance: f32,
    pub target: Vec3,
    pub orthographic: bool,
    /// Half the visible height in world units when orthographic
    pub ortho_scale: f32,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for Camera3D {
    fn default() -> Self {
        let fov_y = 50f32.to_radians();
        Self {
            rotation: Self::rotation_from_angles(DEFAULT_YAW_DEGREES, DEFAULT_PITCH_DEGREES),
            distance: DEFAULT_DISTANCE,
            target: Vec3::ZERO,
            orthographic: false,
            ortho_scale: DEFAULT_DISTANCE * (fov_y * 0.5).tan(),
            fov_y,
            near: 0.05,
            far: 10_000.0,
            min_distance: 0.1,
            max_distance: 5_000.0,
        }
    }
}

impl Camera3D {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orientation for a yaw around world Y followed by a pitch around local X
    pub fn rotation_from_angles(yaw_degrees: f32, pitch_degrees: f32) -> Quat {
        (Quat::from_rotation_y(yaw_degrees.to_radians())
            * Quat::from_rotation_x(pitch_degrees.to_radians()))
        .normalize()
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn position(&self) -> Vec3 {
        self.target - self.forward() * self.distance
    }

    /// Elevation in degrees; negative when looking down
    pub fn pitch(&self) -> f32 {
        self.forward().y.clamp(-1.0, 1.0).asin().to_degrees()
    }

    /// Heading in degrees around world Y
    pub fn yaw(&self) -> f32 {
        let back = -self.forward();
        back.x.atan2(back.z).to_degrees()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_quat(self.rotation.conjugate()) * Mat4::from_translation(-self.position())
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        if self.orthographic {
            let h = self.ortho_scale;
            Mat4::orthographic_rh(-h * aspect, h * aspect, -h, h, -self.far, self.far)
        } else {
            Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
        }
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Rotate around the target: `yaw_degrees` around world Y, `pitch_degrees`
    /// around the camera's right axis.
    pub fn orbit(&mut self, yaw_degrees: f32, pitch_degrees: f32) {
        let yaw = Quat::from_rotation_y(yaw_degrees.to_radians());
        let pitch = Quat::from_rotation_x(pitch_degrees.to_radians());
        self.rotation = (yaw * self.rotation * pitch).normalize();
    }

    /// World units covered by one pixel at the target depth
    pub fn world_per_pixel(&self, viewport_height: f32) -> f32 {
        if viewport_height <= 0.0 {
            return 0.0;
        }
        let half_height = if self.orthographic {
            self.ortho_scale
        } else {
            self.distance * (self.fov_y * 0.5).tan()
        };
        2.0 * half_height / viewport_height
    }

    /// Move the target so the scene follows a pointer drag of `(dx, dy)` pixels
    pub fn pan(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let scale = self.world_per_pixel(viewport_height);
        self.target += (-self.right() * dx + self.up() * dy) * scale;
    }

    /// Scale the distance by `factor` (< 1 zooms in), clamped to the allowed range
    pub fn zoom(&mut self, factor: f32) -> f32 {
        if !factor.is_finite() || factor <= 0.0 {
            return 1.0;
        }
        let old = self.distance;
        self.distance = (self.distance * factor).clamp(self.min_distance, self.max_distance);
        let applied = self.distance / old;
        self.ortho_scale *= applied;
        applied
    }

    /// Zoom keeping `anchor` fixed on screen
    pub fn zoom_towards(&mut self, factor: f32, anchor: Vec3) {
        let applied = self.zoom(factor);
        self.target = anchor + (self.target - anchor) * applied;
    }

    /// Move the orbit pivot without moving the camera
    pub fn retarget(&mut self, pivot: Vec3) {
        let eye = self.position();
        let to_pivot = pivot - eye;
        let distance = to_pivot.length();
        if distance < 1e-4 {
            return;
        }
        self.rotation = rotation_looking_along(to_pivot / distance, self.up());
        self.target = pivot;
        self.distance = distance.clamp(self.min_distance, self.max_distance);
    }

    pub fn set_orthographic(&mut self, orthographic: bool) {
        if orthographic && !self.orthographic {
            self.ortho_scale = self.distance * (self.fov_y * 0.5).tan();
        }
        self.orthographic = orthographic;
    }

    pub fn toggle_orthographic(&mut self) {
        self.set_orthographic(!self.orthographic);
    }

    /// Orientation looking down `axis` (0 = X, 1 = Y, 2 = Z) from its
    /// positive side when `positive`, from the negative side otherwise.
    pub fn axis_rotation(axis: usize, positive: bool) -> Quat {
        let quarter_turn = std::f32::consts::FRAC_PI_2;
        match (axis, positive) {
            (0, true) => Quat::from_rotation_y(quarter_turn),
            (0, false) => Quat::from_rotation_y(-quarter_turn),
            (1, true) => Quat::from_rotation_x(-quarter_turn),
            (1, false) => Quat::from_rotation_x(quarter_turn),
            (_, true) => Quat::IDENTITY,
            (_, false) => Quat::from_rotation_y(std::f32::consts::PI),
        }
    }

    /// Snap to an orthographic view along an axis
    pub fn snap_to_axis(&mut self, axis: usize, positive: bool) {
        self.rotation = Self::axis_rotation(axis, positive);
        self.set_orthographic(true);
    }

    pub fn reset(&mut self) {
        *self = Self {
            min_distance: self.min_distance,
            max_distance: self.max_distance,
            fov_y: self.fov_y,
            ..Self::default()
        };
        self.ortho_scale = self.distance * (self.fov_y * 0.5).tan();
    }

    /// Ray through `point` (window coordinates) inside `viewport`
    pub fn screen_ray(&self, point: Point, viewport: &Rect) -> Ray {
        let (nx, ny) = ndc(point, viewport);
        let aspect = aspect_of(viewport);
        if self.orthographic {
            let origin = self.position()
                + self.right() * nx * self.ortho_scale * aspect
                + self.up() * ny * self.ortho_scale;
            Ray {
                origin,
                direction: self.forward(),
            }
        } else {
            let tan = (self.fov_y * 0.5).tan();
            let local = Vec3::new(nx * tan * aspect, ny * tan, -1.0).normalize();
            Ray {
                origin: self.position(),
                direction: self.rotation * local,
            }
        }
    }

    /// Project a world point to window coordinates, with its view-space depth.
    /// Returns `None` for points behind the camera.
    pub fn project(&self, world: Vec3, viewport: &Rect) -> Option<(Point, f32)> {
        let view = self.view_matrix() * world.extend(1.0);
        if !self.orthographic && view.z > -self.near {
            return None;
        }
        let clip = self.projection_matrix(aspect_of(viewport)) * view;
        if clip.w.abs() < 1e-6 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some((ndc_to_screen(ndc.x, ndc.y, viewport), view.z))
    }
}

pub(crate) fn aspect_of(viewport: &Rect) -> f32 {
    if viewport.height() > 0.0 {
        viewport.width() / viewport.height()
    } else {
        1.0
    }
}

fn ndc(point: Point, viewport: &Rect) -> (f32, f32) {
    let w = viewport.width().max(1.0);
    let h = viewport.height().max(1.0);
    (
        (point.x - viewport.min[0]) / w * 2.0 - 1.0,
        1.0 - (point.y - viewport.min[1]) / h * 2.0,
    )
}

pub(crate) fn ndc_to_screen(x: f32, y: f32, viewport: &Rect) -> Point {
    Point::new(
        viewport.min[0] + (x + 1.0) * 0.5 * viewport.width(),
        viewport.min[1] + (1.0 - y) * 0.5 * viewport.height(),
    )
}

/// Rotation whose -Z points along `forward` with +Y as close to `up` as possible
fn rotation_looking_along(forward: Vec3, up: Vec3) -> Quat {
    let back = -forward;
    let mut right = up.cross(back);
    if right.length_squared() < 1e-8 {
        right = Vec3::Y.cross(back);
        if right.length_squared() < 1e-8 {
            right = Vec3::X;
        }
    }
    let right = right.normalize();
    let up = back.cross(right);
    Quat::from_mat3(&glam::Mat3::from_cols(right, up, back)).normalize()
}
