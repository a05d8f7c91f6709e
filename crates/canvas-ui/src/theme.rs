use crate::color::{catppuccin, Color};

/// Named colors and alpha constants consumed by the UI each frame.
///
/// Themes are plain values passed by reference. Swapping themes at runtime is
/// done through `Canvas::set_theme`, which invalidates every region.
#[derive(Clone, Debug, PartialEq)]
pub struct Theme {
    pub background: Color,
    pub panel: Color,
    pub header: Color,
    pub border: Color,
    pub accent: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub hover_background: Color,
    pub splitter: Color,
    pub splitter_active: Color,
    pub shadow: Color,

    pub axis_x: Color,
    pub axis_y: Color,
    pub axis_z: Color,
    pub grid_major: Color,
    pub grid_minor: Color,
    pub viewport_background: Color,

    /// Alpha of positive-axis gizmo spheres
    pub positive_sphere_alpha: f32,
    /// Alpha of the blended fill inside negative-axis rings
    pub negative_fill_alpha: f32,
    /// Alpha of the outline of negative-axis rings
    pub negative_ring_alpha: f32,
    /// Alpha of gizmo axis lines
    pub line_alpha: f32,
    /// Alpha of the disc drawn behind a hovered gizmo
    pub hover_background_alpha: f32,
}

impl Theme {
    pub fn dark() -> Self {
        use catppuccin::mocha::*;

        Self {
            background: BASE,
            panel: MANTLE,
            header: CRUST,
            border: SURFACE0,
            accent: BLUE,
            text_primary: TEXT,
            text_secondary: SUBTEXT0,
            hover_background: SURFACE1,
            splitter: SURFACE0,
            splitter_active: LAVENDER,
            shadow: Color::rgba(0.0, 0.0, 0.0, 0.45),

            axis_x: RED,
            axis_y: GREEN,
            axis_z: BLUE,
            grid_major: OVERLAY0,
            grid_minor: SURFACE1,
            viewport_background: Color::srgba(40, 40, 56, 255),

            positive_sphere_alpha: 1.0,
            negative_fill_alpha: 0.85,
            negative_ring_alpha: 0.9,
            line_alpha: 0.8,
            hover_background_alpha: 0.2,
        }
    }

    pub fn light() -> Self {
        use catppuccin::latte::*;

        Self {
            background: BASE,
            panel: MANTLE,
            header: CRUST,
            border: SURFACE1,
            accent: BLUE,
            text_primary: TEXT,
            text_secondary: SUBTEXT0,
            hover_background: SURFACE0,
            splitter: SURFACE1,
            splitter_active: LAVENDER,
            shadow: Color::rgba(0.0, 0.0, 0.0, 0.2),

            axis_x: RED,
            axis_y: GREEN,
            axis_z: BLUE,
            grid_major: OVERLAY1,
            grid_minor: SURFACE2,
            viewport_background: Color::srgba(220, 224, 232, 255),

            positive_sphere_alpha: 1.0,
            negative_fill_alpha: 0.8,
            negative_ring_alpha: 0.9,
            line_alpha: 0.7,
            hover_background_alpha: 0.15,
        }
    }

    /// Axis color by index (0 = X, 1 = Y, 2 = Z)
    pub fn axis_color(&self, axis: usize) -> Color {
        match axis {
            0 => self.axis_x,
            1 => self.axis_y,
            _ => self.axis_z,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}
