//! Frame and event entry points for an application shell.

use canvas_ui::{FrameStats, InputEvent, Rect, RenderBackend, Renderer, RendererConfig, Theme};

use crate::editor::EditorKind;
use crate::region::{Region, RegionFlags, RegionId};
use crate::tree::{RegionTree, TreeConfig};

/// Owns the region tree, the renderer and the active theme.
///
/// # Example
///
/// ```ignore
/// let mut canvas = Canvas::new(Box::new(HeadlessBackend::new()), CanvasConfig::default(), [1280, 720]);
/// let root = canvas.create_region(Rect::new([0.0, 0.0], [1280.0, 720.0]), EditorKind::Viewport3D);
/// canvas.tree_mut().split(root, SplitDirection::Vertical, 0.7);
///
/// canvas.begin_frame();
/// canvas.render();
/// canvas.end_frame();
/// canvas.present_frame();
/// ```
pub struct Canvas {
    tree: RegionTree,
    renderer: Renderer,
    theme: Theme,
    size: [u32; 2],
}

#[derive(Clone, Debug, Default)]
pub struct CanvasConfig {
    pub renderer: RendererConfig,
    pub tree: TreeConfig,
    pub theme: Theme,
}

impl Canvas {
    pub fn new(backend: Box<dyn RenderBackend>, config: CanvasConfig, size: [u32; 2]) -> Self {
        let mut renderer = Renderer::new(backend, config.renderer);
        renderer.resize(size);
        let mut tree = RegionTree::new(config.tree);
        tree.set_theme(&config.theme);
        Self {
            tree,
            renderer,
            theme: config.theme,
            size,
        }
    }

    pub fn tree(&self) -> &RegionTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut RegionTree {
        &mut self.tree
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    // ========== Regions ==========

    pub fn create_region(&mut self, bounds: Rect, kind: EditorKind) -> RegionId {
        self.tree.create_root(bounds, kind)
    }

    pub fn destroy_region(&mut self, id: RegionId) -> bool {
        let destroyed = self.tree.destroy_region(id);
        if destroyed {
            self.renderer.mark_full_redraw();
        }
        destroyed
    }

    pub fn get_region(&self, id: RegionId) -> Option<&Region> {
        self.tree.get_region(id)
    }

    // ========== Frame ==========

    /// Start a frame. A full redraw (first frame, resize) forces every
    /// region to draw.
    pub fn begin_frame(&mut self) {
        if self.renderer.dirty_rects().is_full_redraw() {
            self.tree.mark_all(RegionFlags::FORCE_UPDATE);
        }
        self.renderer.begin_frame(self.size);
    }

    /// Draw every region that needs it; returns how many were drawn
    pub fn render(&mut self) -> usize {
        self.tree.render(&mut self.renderer, &self.theme)
    }

    pub fn end_frame(&mut self) -> FrameStats {
        self.renderer.end_frame()
    }

    pub fn present_frame(&mut self) {
        self.renderer.present();
    }

    /// Whether any region would draw if a frame ran now
    pub fn needs_redraw(&self) -> bool {
        self.tree
            .roots()
            .iter()
            .any(|id| self.tree.get_region(*id).is_some_and(Region::needs_update))
    }

    // ========== Events ==========

    /// Route an event to the tree; returns whether it was handled
    pub fn handle_event(&mut self, event: &InputEvent) -> bool {
        self.tree.handle_event(event)
    }

    /// Advance animations by `dt` seconds
    pub fn update(&mut self, dt: f32) -> bool {
        self.tree.update(dt)
    }

    /// Resize the surface, scaling every root region with the window. Split
    /// ratios are refitted so leaves keep their minimum size where it fits.
    pub fn resize(&mut self, size: [u32; 2]) {
        if size == self.size || size[0] == 0 || size[1] == 0 {
            return;
        }
        let sx = size[0] as f32 / self.size[0].max(1) as f32;
        let sy = size[1] as f32 / self.size[1].max(1) as f32;
        log::debug!("canvas resize {:?} -> {size:?}", self.size);
        self.size = size;
        self.renderer.resize(size);

        let roots = self.tree.roots().to_vec();
        for root in roots {
            let Some(bounds) = self.tree.get_region(root).map(Region::bounds) else {
                continue;
            };
            let scaled = Rect::new(
                [bounds.min[0] * sx, bounds.min[1] * sy],
                [bounds.max[0] * sx, bounds.max[1] * sy],
            );
            self.tree.set_bounds(root, scaled);
        }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.tree.set_theme(&theme);
        self.theme = theme;
        self.renderer.mark_full_redraw();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_ui::HeadlessBackend;
    use canvas_ui_interactive::SplitDirection;

    fn canvas() -> Canvas {
        Canvas::new(Box::new(HeadlessBackend::new()), CanvasConfig::default(), [800, 600])
    }

    #[test]
    fn test_first_frame_draws_everything() {
        let mut canvas = canvas();
        canvas.create_region(Rect::new([0.0, 0.0], [800.0, 600.0]), EditorKind::Outliner);
        canvas.begin_frame();
        assert_eq!(canvas.render(), 1);
        let stats = canvas.end_frame();
        assert!(stats.vertices > 0);
        canvas.present_frame();
        assert!(!canvas.needs_redraw());
    }

    #[test]
    fn test_resize_scales_roots() {
        let mut canvas = canvas();
        let root = canvas.create_region(Rect::new([0.0, 0.0], [800.0, 600.0]), EditorKind::Console);
        canvas.resize([400, 300]);
        let bounds = canvas.get_region(root).unwrap().bounds();
        assert_eq!(bounds.max, [400.0, 300.0]);
        assert!(canvas.needs_redraw());
    }

    #[test]
    fn test_resize_keeps_leaves_above_minimum() {
        let mut canvas = canvas();
        let min = canvas.tree().config().min_region_size;
        let root = canvas.create_region(Rect::new([0.0, 0.0], [800.0, 600.0]), EditorKind::Viewport3D);
        let (_, side) = canvas
            .tree_mut()
            .split(root, SplitDirection::Vertical, 0.8)
            .unwrap();

        // Scaling alone would leave the side region about 79px wide
        canvas.resize([400, 600]);
        let side_width = canvas.get_region(side).unwrap().bounds().width();
        assert!(side_width >= min - 1e-3, "side region is {side_width} wide");
        assert_eq!(canvas.get_region(root).unwrap().bounds().max, [400.0, 600.0]);
    }

    #[test]
    fn test_set_theme_marks_regions() {
        let mut canvas = canvas();
        let root = canvas.create_region(Rect::new([0.0, 0.0], [800.0, 600.0]), EditorKind::Timeline);
        canvas.begin_frame();
        canvas.render();
        canvas.end_frame();
        canvas.present_frame();

        canvas.set_theme(Theme::light());
        let flags = canvas.get_region(root).unwrap().flags();
        assert!(flags.contains(RegionFlags::THEME_CHANGED));
    }

    #[test]
    fn test_destroy_unknown_region() {
        let mut canvas = canvas();
        let root = canvas.create_region(Rect::new([0.0, 0.0], [800.0, 600.0]), EditorKind::Console);
        assert!(canvas.destroy_region(root));
        assert!(!canvas.destroy_region(root));
    }
}
