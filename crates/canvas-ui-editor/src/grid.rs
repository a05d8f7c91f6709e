//! Ground-plane grid for the 3D viewport.
//!
//! The grid lies on the XZ plane around the camera target. Its extent grows
//! with the camera distance so it reads as infinite, and line spacing steps by
//! powers of ten so the line count stays bounded at any zoom.

use canvas_ui::{Color, Rect, Renderer, Theme};
use canvas_ui_macros::Settings;
use glam::{Vec3, Vec4};

use crate::camera::{aspect_of, ndc_to_screen, Camera3D};

#[derive(Clone, Debug, PartialEq, Settings)]
pub struct GridStyle {
    /// Extent never drops below this many world units
    pub min_extent: f32,
    /// Extent is at least `distance * extent_per_distance`
    pub extent_per_distance: f32,
    /// Every n-th line is a major line
    #[settings(range(min = 2, max = 100))]
    pub major_every: i64,
    /// Lines drawn on each side of the centre line, per direction
    #[settings(range(min = 1, max = 500))]
    pub max_lines_per_side: i64,
    pub minor_width: f32,
    pub major_width: f32,
    pub axis_width: f32,
}

impl Default for GridStyle {
    fn default() -> Self {
        Self {
            min_extent: 2000.0,
            extent_per_distance: 6.0,
            major_every: 10,
            max_lines_per_side: 100,
            minor_width: 1.0,
            major_width: 1.5,
            axis_width: 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridLineKind {
    Minor,
    Major,
    /// The line lying on a world axis (0 = X, 2 = Z)
    Axis(usize),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridLine {
    pub from: Vec3,
    pub to: Vec3,
    pub kind: GridLineKind,
}

#[derive(Clone, Debug, Default)]
pub struct GridRenderer {
    pub style: GridStyle,
}

impl GridRenderer {
    pub fn new(style: GridStyle) -> Self {
        Self {
            style: style.sanitized(),
        }
    }

    /// Half-size of the grid in world units
    pub fn extent(&self, camera: &Camera3D) -> f32 {
        self.style
            .min_extent
            .max(camera.distance * self.style.extent_per_distance)
    }

    /// Power-of-ten spacing giving roughly ten cells across the view
    pub fn spacing(&self, camera: &Camera3D) -> f32 {
        let reference = (camera.distance / 10.0).max(1e-3);
        10f32.powf(reference.log10().floor())
    }

    /// Spacing actually drawn: `spacing` doubled until the full extent, plus
    /// half a cell for snapping to the target, fits in `max_lines_per_side`
    pub fn line_spacing(&self, camera: &Camera3D) -> f32 {
        let extent = self.extent(camera);
        let max_lines = self.style.max_lines_per_side as f32;
        let mut spacing = self.spacing(camera);
        while extent / spacing + 0.5 > max_lines {
            spacing *= 2.0;
        }
        spacing
    }

    /// Grid lines around the camera target, in world space. The outermost
    /// lines lie at or beyond `extent` from the target.
    pub fn lines(&self, camera: &Camera3D) -> Vec<GridLine> {
        let spacing = self.line_spacing(camera);
        // Lines snap to the cell nearest the target, which can sit half a
        // cell off centre
        let count = (self.extent(camera) / spacing + 0.5).ceil() as i64;
        let half = count as f32 * spacing;

        let cx = (camera.target.x / spacing).round() as i64;
        let cz = (camera.target.z / spacing).round() as i64;
        let (x0, x1) = (cx as f32 * spacing - half, cx as f32 * spacing + half);
        let (z0, z1) = (cz as f32 * spacing - half, cz as f32 * spacing + half);

        let mut lines = Vec::with_capacity((4 * count + 2) as usize);
        for i in -count..=count {
            // Constant x, running along Z
            let index = cx + i;
            let x = index as f32 * spacing;
            lines.push(GridLine {
                from: Vec3::new(x, 0.0, z0),
                to: Vec3::new(x, 0.0, z1),
                kind: self.classify(index, 2),
            });

            // Constant z, running along X
            let index = cz + i;
            let z = index as f32 * spacing;
            lines.push(GridLine {
                from: Vec3::new(x0, 0.0, z),
                to: Vec3::new(x1, 0.0, z),
                kind: self.classify(index, 0),
            });
        }
        lines
    }

    fn classify(&self, index: i64, axis: usize) -> GridLineKind {
        if index == 0 {
            GridLineKind::Axis(axis)
        } else if index % self.style.major_every == 0 {
            GridLineKind::Major
        } else {
            GridLineKind::Minor
        }
    }

    pub fn render(&self, renderer: &mut Renderer, theme: &Theme, camera: &Camera3D, viewport: &Rect) {
        let view = camera.view_matrix();
        let projection = camera.projection_matrix(aspect_of(viewport));
        let near = -camera.near;

        let project = |p: Vec4| {
            let clip = projection * p;
            let ndc = clip.truncate() / clip.w;
            ndc_to_screen(ndc.x, ndc.y, viewport)
        };

        renderer.with_clip(*viewport, |renderer| {
            for line in self.lines(camera) {
                let mut a = view * line.from.extend(1.0);
                let mut b = view * line.to.extend(1.0);

                if !camera.orthographic {
                    if a.z > near && b.z > near {
                        continue;
                    }
                    // Clip the part behind the near plane
                    if a.z > near {
                        a = a + (b - a) * ((near - a.z) / (b.z - a.z));
                    } else if b.z > near {
                        b = b + (a - b) * ((near - b.z) / (a.z - b.z));
                    }
                }

                let (color, width) = self.appearance(line.kind, theme);
                renderer.draw_line_batched(project(a), project(b), width, color);
            }
        });
    }

    fn appearance(&self, kind: GridLineKind, theme: &Theme) -> (Color, f32) {
        match kind {
            GridLineKind::Minor => (theme.grid_minor, self.style.minor_width),
            GridLineKind::Major => (theme.grid_major, self.style.major_width),
            GridLineKind::Axis(axis) => (theme.axis_color(axis), self.style.axis_width),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_ui::{HeadlessBackend, RendererConfig};

    #[test]
    fn test_extent_scales_with_distance() {
        let grid = GridRenderer::default();
        let mut camera = Camera3D::default();
        assert_eq!(grid.extent(&camera), 2000.0);
        camera.distance = 1000.0;
        assert_eq!(grid.extent(&camera), 6000.0);
    }

    #[test]
    fn test_spacing_steps_by_powers_of_ten() {
        let grid = GridRenderer::default();
        let mut camera = Camera3D::default();
        assert!((grid.spacing(&camera) - 1.0).abs() < 1e-6);
        camera.distance = 250.0;
        assert!((grid.spacing(&camera) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_line_count_is_bounded() {
        let grid = GridRenderer::default();
        let mut camera = Camera3D::default();
        for distance in [0.2, 10.0, 333.0, 4999.0] {
            camera.distance = distance;
            assert!(grid.lines(&camera).len() <= 2 * (2 * 100 + 1));
        }
    }

    #[test]
    fn test_outermost_line_reaches_extent() {
        let grid = GridRenderer::default();
        let mut camera = Camera3D::default();
        camera.target = Vec3::new(3.3, 0.0, -7.1);
        for distance in [10.0, 100.0, 1000.0] {
            camera.distance = distance;
            let extent = grid.extent(&camera);
            let reach = grid
                .lines(&camera)
                .iter()
                .map(|l| (l.from.x - camera.target.x).abs().max((l.from.z - camera.target.z).abs()))
                .fold(0.0f32, f32::max);
            assert!(reach >= extent, "distance {distance}: reach {reach} < extent {extent}");
        }
    }

    #[test]
    fn test_axis_lines_are_tagged() {
        let grid = GridRenderer::default();
        let lines = grid.lines(&Camera3D::default());
        let axes: Vec<_> = lines
            .iter()
            .filter(|l| matches!(l.kind, GridLineKind::Axis(_)))
            .collect();
        assert_eq!(axes.len(), 2);
        assert!(lines.iter().any(|l| l.kind == GridLineKind::Major));
    }

    #[test]
    fn test_render_emits_lines_inside_viewport() {
        let mut renderer = Renderer::new(Box::new(HeadlessBackend::new()), RendererConfig::default());
        let viewport = Rect::new([0.0, 0.0], [800.0, 600.0]);
        renderer.begin_frame([800, 600]);
        GridRenderer::default().render(&mut renderer, &Theme::dark(), &Camera3D::default(), &viewport);
        let stats = renderer.end_frame();
        assert!(stats.vertices > 0);
        assert!(renderer.current_clip().is_none());
    }
}
