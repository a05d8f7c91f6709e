//! Regions: nodes of the split layout tree.
//!
//! A region is either a leaf hosting an [`Editor`] or a split owning exactly
//! two child regions. Regions live in the tree's arena and refer to each
//! other by [`RegionId`].

use std::cell::Cell;
use std::rc::Rc;

use bitflags::bitflags;
use canvas_ui::{Rect, Theme};
use canvas_ui_interactive::{EditorTypeDropdown, RegionSplitter, SplitDirection, WidgetManager};
use slotmap::new_key_type;

use crate::editor::{Editor, EditorKind};

new_key_type! {
    /// Handle to a region in a [`crate::RegionTree`]
    pub struct RegionId;
}

bitflags! {
    /// Invalidation state of a region.
    ///
    /// A region with no update bits set is skipped entirely by the render
    /// pass. `DRAWING` is held while the region renders; no bits can be set
    /// while it is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RegionFlags: u16 {
        const CONTENT_CHANGED = 1 << 0;
        const LAYOUT_CHANGED = 1 << 1;
        const OVERLAY_CHANGED = 1 << 2;
        const SIZE_CHANGED = 1 << 3;
        const THEME_CHANGED = 1 << 4;
        const DRAWING = 1 << 5;
        const FORCE_UPDATE = 1 << 6;
        /// A descendant has update bits set
        const CHILD_CHANGED = 1 << 7;
    }
}

impl RegionFlags {
    /// Every bit that requests a redraw
    pub const UPDATE_MASK: RegionFlags = RegionFlags::DRAWING.complement();
}

/// Content of a leaf region
pub struct LeafContent {
    pub editor: Editor,
    pub header: EditorTypeDropdown,
    /// Written by the header dropdown's selection callback
    requested: Rc<Cell<Option<EditorKind>>>,
}

impl LeafContent {
    pub(crate) fn new(editor: Editor, theme: &Theme) -> Self {
        let requested = Rc::new(Cell::new(None));
        let header = header_dropdown(editor.kind(), theme, requested.clone());
        Self {
            editor,
            header,
            requested,
        }
    }

    /// Rebuild the header with colours from `theme`, keeping the selection
    pub(crate) fn refresh_header(&mut self, theme: &Theme) {
        if self.header.is_open() {
            self.header.close();
        }
        let bounds = canvas_ui_interactive::Widget::bounds(&self.header);
        self.header = header_dropdown(self.editor.kind(), theme, self.requested.clone());
        canvas_ui_interactive::Widget::set_bounds(&mut self.header, bounds);
    }

    /// Editor kind picked in the header since the last call
    pub(crate) fn take_requested_kind(&self) -> Option<EditorKind> {
        self.requested.take()
    }
}

fn header_dropdown(
    kind: EditorKind,
    theme: &Theme,
    requested: Rc<Cell<Option<EditorKind>>>,
) -> EditorTypeDropdown {
    EditorTypeDropdown::new(EditorKind::dropdown_items(theme))
        .with_selected(kind.index())
        .on_select(move |index| requested.set(EditorKind::from_index(index)))
}

/// Content of a split region
pub struct SplitContent {
    pub direction: SplitDirection,
    /// Always within [0.1, 0.9]
    pub ratio: f32,
    pub children: [RegionId; 2],
    pub splitter: RegionSplitter,
}

pub enum RegionContent {
    Leaf(LeafContent),
    Split(SplitContent),
}

pub struct Region {
    id: RegionId,
    pub(crate) bounds: Rect,
    pub(crate) parent: Option<RegionId>,
    pub(crate) content: RegionContent,
    pub show_header: bool,
    flags: RegionFlags,
    pub widgets: WidgetManager,
}

impl Region {
    pub(crate) fn new(
        id: RegionId,
        bounds: Rect,
        parent: Option<RegionId>,
        content: RegionContent,
        show_header: bool,
    ) -> Self {
        Self {
            id,
            bounds,
            parent,
            content,
            show_header,
            flags: RegionFlags::CONTENT_CHANGED
                | RegionFlags::LAYOUT_CHANGED
                | RegionFlags::SIZE_CHANGED,
            widgets: WidgetManager::new(),
        }
    }

    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn parent(&self) -> Option<RegionId> {
        self.parent
    }

    pub fn content(&self) -> &RegionContent {
        &self.content
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.content, RegionContent::Leaf(_))
    }

    pub fn is_split(&self) -> bool {
        matches!(self.content, RegionContent::Split(_))
    }

    pub fn editor(&self) -> Option<&Editor> {
        match &self.content {
            RegionContent::Leaf(leaf) => Some(&leaf.editor),
            RegionContent::Split(_) => None,
        }
    }

    pub fn editor_mut(&mut self) -> Option<&mut Editor> {
        match &mut self.content {
            RegionContent::Leaf(leaf) => Some(&mut leaf.editor),
            RegionContent::Split(_) => None,
        }
    }

    pub fn header(&self) -> Option<&EditorTypeDropdown> {
        match &self.content {
            RegionContent::Leaf(leaf) => Some(&leaf.header),
            RegionContent::Split(_) => None,
        }
    }

    pub fn children(&self) -> Option<[RegionId; 2]> {
        match &self.content {
            RegionContent::Split(split) => Some(split.children),
            RegionContent::Leaf(_) => None,
        }
    }

    pub fn split_direction(&self) -> Option<SplitDirection> {
        match &self.content {
            RegionContent::Split(split) => Some(split.direction),
            RegionContent::Leaf(_) => None,
        }
    }

    pub fn split_ratio(&self) -> Option<f32> {
        match &self.content {
            RegionContent::Split(split) => Some(split.ratio),
            RegionContent::Leaf(_) => None,
        }
    }

    // ========== Invalidation ==========

    pub fn flags(&self) -> RegionFlags {
        self.flags
    }

    /// Set `flags` unless the region is drawing. Returns whether they were set.
    pub fn set_flags(&mut self, flags: RegionFlags) -> bool {
        if self.is_drawing() {
            log::trace!("ignoring {flags:?} on {:?} while drawing", self.id);
            return false;
        }
        self.flags |= flags & RegionFlags::UPDATE_MASK;
        true
    }

    pub fn mark_content_changed(&mut self) -> bool {
        self.set_flags(RegionFlags::CONTENT_CHANGED)
    }

    pub fn mark_layout_changed(&mut self) -> bool {
        self.set_flags(RegionFlags::LAYOUT_CHANGED)
    }

    pub fn mark_overlay_changed(&mut self) -> bool {
        self.set_flags(RegionFlags::OVERLAY_CHANGED)
    }

    pub fn mark_size_changed(&mut self) -> bool {
        self.set_flags(RegionFlags::SIZE_CHANGED)
    }

    pub fn mark_theme_changed(&mut self) -> bool {
        self.set_flags(RegionFlags::THEME_CHANGED)
    }

    pub fn mark_force_update(&mut self) -> bool {
        self.set_flags(RegionFlags::FORCE_UPDATE)
    }

    pub fn needs_update(&self) -> bool {
        self.flags.intersects(RegionFlags::UPDATE_MASK)
    }

    /// Clear every update bit; the drawing bit is left alone
    pub fn clear_update_flags(&mut self) {
        self.flags &= RegionFlags::DRAWING;
    }

    pub fn is_drawing(&self) -> bool {
        self.flags.contains(RegionFlags::DRAWING)
    }

    /// Enter the drawing state; false if already drawing
    pub(crate) fn begin_drawing(&mut self) -> bool {
        if self.is_drawing() {
            return false;
        }
        self.flags.insert(RegionFlags::DRAWING);
        true
    }

    pub(crate) fn end_drawing(&mut self) {
        self.flags.remove(RegionFlags::DRAWING);
    }

    /// Replace the update bits after a render, bypassing the drawing guard
    pub(crate) fn reset_update_flags(&mut self, flags: RegionFlags) {
        self.flags = (self.flags & RegionFlags::DRAWING) | (flags & RegionFlags::UPDATE_MASK);
    }

    // ========== Layout ==========

    /// Header strip at the top of a leaf, if shown and there is room for it
    pub fn header_rect(&self, header_height: f32) -> Option<Rect> {
        if !self.show_header || !self.is_leaf() || self.bounds.height() <= header_height {
            return None;
        }
        Some(Rect::new(
            self.bounds.min,
            [self.bounds.max[0], self.bounds.min[1] + header_height],
        ))
    }

    /// Area handed to the editor: the bounds minus the header
    pub fn content_bounds(&self, header_height: f32) -> Rect {
        match self.header_rect(header_height) {
            Some(header) => Rect::new([self.bounds.min[0], header.max[1]], self.bounds.max),
            None => self.bounds,
        }
    }
}

/// Child rectangles of `bounds` split at `ratio`, with `gap` between them.
///
/// The first child ends `gap / 2` before the split line and the second
/// starts `gap / 2` after it, so the two plus the gap tile `bounds`.
pub fn split_bounds(bounds: &Rect, direction: SplitDirection, ratio: f32, gap: f32) -> (Rect, Rect) {
    let half_gap = gap * 0.5;
    match direction {
        SplitDirection::Horizontal => {
            let line = bounds.min[1] + bounds.height() * ratio;
            (
                Rect::new(bounds.min, [bounds.max[0], line - half_gap]),
                Rect::new([bounds.min[0], line + half_gap], bounds.max),
            )
        }
        SplitDirection::Vertical => {
            let line = bounds.min[0] + bounds.width() * ratio;
            (
                Rect::new(bounds.min, [line - half_gap, bounds.max[1]]),
                Rect::new([line + half_gap, bounds.min[1]], bounds.max),
            )
        }
    }
}

/// The gap strip between the two children of a split
pub fn gap_rect(bounds: &Rect, direction: SplitDirection, ratio: f32, gap: f32) -> Rect {
    let (first, second) = split_bounds(bounds, direction, ratio, gap);
    match direction {
        SplitDirection::Horizontal => Rect::new([bounds.min[0], first.max[1]], [bounds.max[0], second.min[1]]),
        SplitDirection::Vertical => Rect::new([first.max[0], bounds.min[1]], [second.min[0], bounds.max[1]]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorId;
    use slotmap::SlotMap;

    fn leaf() -> Region {
        let mut ids: SlotMap<RegionId, ()> = SlotMap::with_key();
        let id = ids.insert(());
        let editor = Editor::new(EditorId(1), EditorKind::Viewport3D);
        Region::new(
            id,
            Rect::new([0.0, 0.0], [400.0, 300.0]),
            None,
            RegionContent::Leaf(LeafContent::new(editor, &Theme::dark())),
            true,
        )
    }

    #[test]
    fn test_marking_is_idempotent() {
        let mut region = leaf();
        region.clear_update_flags();
        region.mark_content_changed();
        let once = region.flags();
        region.mark_content_changed();
        assert_eq!(region.flags(), once);
        region.clear_update_flags();
        assert!(!region.needs_update());
    }

    #[test]
    fn test_marks_ignored_while_drawing() {
        let mut region = leaf();
        region.clear_update_flags();
        assert!(region.begin_drawing());
        assert!(!region.begin_drawing());
        assert!(!region.mark_layout_changed());
        assert!(!region.needs_update());
        region.end_drawing();
        assert!(region.mark_layout_changed());
        assert!(region.needs_update());
    }

    #[test]
    fn test_drawing_bit_does_not_count_as_update() {
        let mut region = leaf();
        region.clear_update_flags();
        region.begin_drawing();
        assert!(!region.needs_update());
        region.clear_update_flags();
        assert!(region.is_drawing());
    }

    #[test]
    fn test_content_bounds_exclude_header() {
        let region = leaf();
        let content = region.content_bounds(24.0);
        assert_eq!(content.min, [0.0, 24.0]);
        assert_eq!(content.max, [400.0, 300.0]);
    }

    #[test]
    fn test_split_bounds_tile_parent() {
        let parent = Rect::new([10.0, 20.0], [410.0, 320.0]);
        let (a, b) = split_bounds(&parent, SplitDirection::Vertical, 0.3, 2.0);
        assert!((a.width() + b.width() + 2.0 - parent.width()).abs() < 1e-4);
        assert!(!a.intersects(&b));
        let gap = gap_rect(&parent, SplitDirection::Vertical, 0.3, 2.0);
        assert!((gap.width() - 2.0).abs() < 1e-4);
    }
}
