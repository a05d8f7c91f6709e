//! Per-frame occlusion culling for opaque widgets.

use bitflags::bitflags;

use crate::Rect;

bitflags! {
    /// Per-widget properties that control culling
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WidgetRenderFlags: u8 {
        /// Never cull
        const FORCE_RENDER = 1 << 0;
        /// Draws 3D content with its own depth handling
        const IS_3D = 1 << 1;
        /// Partially transparent; neither culled nor an occluder
        const TRANSPARENT = 1 << 2;
        /// Casts a shadow that extends past its bounds
        const HAS_SHADOW = 1 << 3;
    }
}

impl WidgetRenderFlags {
    /// Whether a widget with these flags may be culled
    pub fn allows_culling(self) -> bool {
        !self.intersects(
            WidgetRenderFlags::FORCE_RENDER
                | WidgetRenderFlags::IS_3D
                | WidgetRenderFlags::TRANSPARENT
                | WidgetRenderFlags::HAS_SHADOW,
        )
    }

    /// Whether a widget with these flags may hide widgets drawn before it
    pub fn can_occlude(self) -> bool {
        !self.intersects(WidgetRenderFlags::TRANSPARENT | WidgetRenderFlags::HAS_SHADOW)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OcclusionStats {
    pub occluders: usize,
    pub tested: usize,
    pub culled: usize,
}

/// Accumulates opaque occluder rectangles for the current frame.
#[derive(Debug, Clone, Default)]
pub struct OcclusionTracker {
    occluders: Vec<Rect>,
    stats: OcclusionStats,
    enabled: bool,
}

impl OcclusionTracker {
    pub fn new() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn begin_frame(&mut self) {
        self.occluders.clear();
        self.stats = OcclusionStats::default();
    }

    pub fn add_occluder(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        // A new occluder inside an existing one adds nothing
        if self.occluders.iter().any(|o| o.contains_rect(&rect)) {
            return;
        }
        self.occluders.retain(|o| !rect.contains_rect(o));
        self.occluders.push(rect);
    }

    /// True if `bounds` is fully hidden by one occluder and `flags` allow culling
    pub fn should_cull_widget(&mut self, bounds: &Rect, flags: WidgetRenderFlags) -> bool {
        self.stats.tested += 1;
        if !self.enabled || !flags.allows_culling() {
            return false;
        }
        let culled = self.occluders.iter().any(|o| o.contains_rect(bounds));
        if culled {
            self.stats.culled += 1;
        }
        culled
    }

    pub fn end_frame(&mut self) {
        self.stats.occluders = self.occluders.len();
        log::trace!(
            "occlusion: {} occluders, {}/{} widgets culled",
            self.stats.occluders,
            self.stats.culled,
            self.stats.tested
        );
    }

    pub fn occluders(&self) -> &[Rect] {
        &self.occluders
    }

    pub fn stats(&self) -> OcclusionStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contained_widget_is_culled() {
        let mut tracker = OcclusionTracker::new();
        tracker.begin_frame();
        tracker.add_occluder(Rect::new([0.0, 0.0], [100.0, 100.0]));

        let inside = Rect::new([10.0, 10.0], [50.0, 50.0]);
        assert!(tracker.should_cull_widget(&inside, WidgetRenderFlags::empty()));

        let partial = Rect::new([50.0, 50.0], [150.0, 150.0]);
        assert!(!tracker.should_cull_widget(&partial, WidgetRenderFlags::empty()));
        assert_eq!(tracker.stats().culled, 1);
    }

    #[test]
    fn test_force_render_is_never_culled() {
        let mut tracker = OcclusionTracker::new();
        tracker.begin_frame();
        tracker.add_occluder(Rect::new([0.0, 0.0], [100.0, 100.0]));

        let inside = Rect::new([10.0, 10.0], [50.0, 50.0]);
        for flags in [
            WidgetRenderFlags::FORCE_RENDER,
            WidgetRenderFlags::IS_3D,
            WidgetRenderFlags::TRANSPARENT,
            WidgetRenderFlags::HAS_SHADOW,
        ] {
            assert!(!tracker.should_cull_widget(&inside, flags));
        }
    }

    #[test]
    fn test_begin_frame_clears_occluders() {
        let mut tracker = OcclusionTracker::new();
        tracker.add_occluder(Rect::new([0.0, 0.0], [100.0, 100.0]));
        tracker.begin_frame();
        assert!(tracker.occluders().is_empty());
        assert!(!tracker.should_cull_widget(
            &Rect::new([1.0, 1.0], [2.0, 2.0]),
            WidgetRenderFlags::empty()
        ));
    }

    #[test]
    fn test_nested_occluders_collapse() {
        let mut tracker = OcclusionTracker::new();
        tracker.add_occluder(Rect::new([10.0, 10.0], [20.0, 20.0]));
        tracker.add_occluder(Rect::new([0.0, 0.0], [100.0, 100.0]));
        tracker.add_occluder(Rect::new([30.0, 30.0], [40.0, 40.0]));
        assert_eq!(tracker.occluders().len(), 1);
    }
}
