use crate::{Color, Rect};

/// Per-instance data for the instanced widget path.
///
/// All instances in a flush share one pipeline, so each record carries its own
/// full transform and styling.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "bytemuck", derive(bytemuck::Pod, bytemuck::Zeroable))]
pub struct WidgetInstance {
    /// Column-major 2x2 linear part `[m00, m10, m01, m11]`
    pub transform: [f32; 4],
    /// Screen-space position of the widget's top-left corner
    pub translation: [f32; 2],
    /// Widget size in pixels before transform
    pub size: [f32; 2],
    /// Fill color (RGBA, 0-255)
    pub color: [u8; 4],
    /// Border color (RGBA, 0-255)
    pub border_color: [u8; 4],
    pub corner_radius: f32,
    pub border_width: f32,
}

impl WidgetInstance {
    pub const SIZE: usize = std::mem::size_of::<WidgetInstance>();

    /// Untransformed instance covering `rect`
    pub fn from_rect(rect: Rect, color: Color) -> Self {
        Self {
            transform: [1.0, 0.0, 0.0, 1.0],
            translation: rect.min,
            size: rect.size(),
            color: color.to_rgba8(),
            border_color: [0; 4],
            corner_radius: 0.0,
            border_width: 0.0,
        }
    }

    pub fn with_corner_radius(mut self, radius: f32) -> Self {
        self.corner_radius = radius;
        self
    }

    pub fn with_border(mut self, width: f32, color: Color) -> Self {
        self.border_width = width;
        self.border_color = color.to_rgba8();
        self
    }

    /// Pre-multiply the instance by a 2D affine transform
    pub fn transformed(mut self, affine: glam::Affine2) -> Self {
        let linear = affine.matrix2 * glam::Mat2::from_cols_array(&self.transform);
        self.transform = linear.to_cols_array();
        self.translation = affine
            .transform_point2(glam::Vec2::from(self.translation))
            .into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_layout() {
        assert_eq!(WidgetInstance::SIZE, 48);
    }

    #[test]
    fn test_transformed_translates_origin() {
        let inst = WidgetInstance::from_rect(Rect::new([10.0, 20.0], [30.0, 40.0]), Color::WHITE)
            .transformed(glam::Affine2::from_translation(glam::Vec2::new(5.0, -5.0)));
        assert_eq!(inst.translation, [15.0, 15.0]);
        assert_eq!(inst.size, [20.0, 20.0]);
        assert_eq!(inst.transform, [1.0, 0.0, 0.0, 1.0]);
    }
}
