//! Dirty-rectangle tracking for partial redraws.

use crate::Rect;

/// Default number of tracked rectangles before falling back to a full redraw
pub const DEFAULT_MAX_DIRTY_RECTS: usize = 8;
/// Default expansion used when testing whether two rectangles should merge
pub const DEFAULT_MERGE_DISTANCE: f32 = 10.0;

/// Screen areas that need redrawing this frame.
///
/// Rectangles closer than `merge_distance` are coalesced into their union.
/// Exceeding `max_rects` switches to full-redraw mode, which suspends
/// individual tracking until [`DirtyRectTracker::clear`].
#[derive(Debug, Clone)]
pub struct DirtyRectTracker {
    rects: Vec<Rect>,
    full_redraw: bool,
    max_rects: usize,
    merge_distance: f32,
}

impl Default for DirtyRectTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIRTY_RECTS, DEFAULT_MERGE_DISTANCE)
    }
}

impl DirtyRectTracker {
    pub fn new(max_rects: usize, merge_distance: f32) -> Self {
        Self {
            rects: Vec::with_capacity(max_rects + 1),
            full_redraw: false,
            max_rects,
            merge_distance,
        }
    }

    pub fn add_dirty_rect(&mut self, rect: Rect) {
        if self.full_redraw || rect.is_empty() {
            return;
        }

        let mut merged = rect;
        // Absorbing one rect can bring others into range, so repeat until stable.
        loop {
            let reach = merged.expand(self.merge_distance);
            let Some(index) = self.rects.iter().position(|r| reach.intersects(r)) else {
                break;
            };
            merged = merged.union(&self.rects.swap_remove(index));
        }
        self.rects.push(merged);

        if self.rects.len() > self.max_rects {
            log::trace!(
                "dirty rect count exceeded {}, switching to full redraw",
                self.max_rects
            );
            self.mark_full_redraw();
        }
    }

    pub fn mark_full_redraw(&mut self) {
        self.full_redraw = true;
        self.rects.clear();
    }

    pub fn is_full_redraw(&self) -> bool {
        self.full_redraw
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn has_damage(&self) -> bool {
        self.full_redraw || !self.rects.is_empty()
    }

    /// Union of all tracked rects, or `None` in full-redraw mode or when clean
    pub fn bounding_rect(&self) -> Option<Rect> {
        if self.full_redraw {
            return None;
        }
        let mut it = self.rects.iter().copied();
        let first = it.next()?;
        Some(it.fold(first, |acc, r| acc.union(&r)))
    }

    /// Whether `rect` overlaps any damaged area
    pub fn needs_redraw(&self, rect: &Rect) -> bool {
        self.full_redraw || self.rects.iter().any(|r| r.intersects(rect))
    }

    pub fn clear(&mut self) {
        self.rects.clear();
        self.full_redraw = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(i: usize) -> Rect {
        let x = i as f32 * 100.0;
        Rect::from_min_size([x, 0.0], [20.0, 20.0])
    }

    #[test]
    fn test_nearby_rects_merge() {
        let mut tracker = DirtyRectTracker::default();
        tracker.add_dirty_rect(Rect::new([0.0, 0.0], [10.0, 10.0]));
        tracker.add_dirty_rect(Rect::new([15.0, 0.0], [25.0, 10.0]));
        assert_eq!(tracker.rects(), &[Rect::new([0.0, 0.0], [25.0, 10.0])]);
    }

    #[test]
    fn test_merge_cascades() {
        let mut tracker = DirtyRectTracker::default();
        tracker.add_dirty_rect(Rect::new([0.0, 0.0], [10.0, 10.0]));
        tracker.add_dirty_rect(Rect::new([40.0, 0.0], [50.0, 10.0]));
        assert_eq!(tracker.rects().len(), 2);

        tracker.add_dirty_rect(Rect::new([18.0, 0.0], [32.0, 10.0]));
        assert_eq!(tracker.rects(), &[Rect::new([0.0, 0.0], [50.0, 10.0])]);
    }

    #[test]
    fn test_more_than_eight_rects_forces_full_redraw() {
        let mut tracker = DirtyRectTracker::default();
        for i in 0..8 {
            tracker.add_dirty_rect(cell(i));
        }
        assert!(!tracker.is_full_redraw());
        assert_eq!(tracker.rects().len(), 8);

        tracker.add_dirty_rect(cell(8));
        assert!(tracker.is_full_redraw());
        assert!(tracker.rects().is_empty());

        // Suspended until cleared
        tracker.add_dirty_rect(cell(20));
        assert!(tracker.rects().is_empty());

        tracker.clear();
        assert!(!tracker.is_full_redraw());
        assert!(!tracker.has_damage());
    }
}
