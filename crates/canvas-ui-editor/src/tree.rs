//! The region tree: layout, invalidation, event routing and rendering for
//! every region in the window.

use std::cell::Cell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use canvas_ui::{InputEvent, InputEventKind, MouseButton, Point, Rect, Renderer, Theme};
use canvas_ui_interactive::{clamp_ratio, RegionSplitter, SplitDirection, Widget};
use canvas_ui_macros::Settings;
use slotmap::SlotMap;

use crate::editor::{Editor, EditorId, EditorKind};
use crate::region::{
    gap_rect, split_bounds, LeafContent, Region, RegionContent, RegionFlags, RegionId,
    SplitContent,
};
use crate::region_menu::{region_menu, ActionSlot, MenuContext, RegionAction};

/// How leaf flags are reset after a render
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RedrawPolicy {
    /// Flags clear to zero; animating editors keep `CONTENT_CHANGED`
    #[default]
    OnDemand,
    /// Every rendered leaf is reset to `CONTENT_CHANGED` and redrawn next frame
    Continuous,
}

#[derive(Clone, Debug, PartialEq, Settings)]
pub struct TreeConfig {
    /// Smallest width and height a split may produce, header included
    #[settings(range(min = 1.0, max = 4096.0))]
    pub min_region_size: f32,
    #[settings(range(min = 0.0, max = 128.0))]
    pub header_height: f32,
    /// Space left between split children for the resize handle
    #[settings(range(min = 0.0, max = 16.0))]
    pub splitter_gap: f32,
    /// Half-width of the band around a split line that starts a resize
    #[settings(range(min = 0.0, max = 32.0))]
    pub splitter_tolerance: f32,
    pub redraw_policy: RedrawPolicy,
    /// Headers shown on newly created leaves
    pub show_headers: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            min_region_size: 100.0,
            header_height: 24.0,
            splitter_gap: 2.0,
            splitter_tolerance: 4.0,
            redraw_policy: RedrawPolicy::OnDemand,
            show_headers: true,
        }
    }
}

/// Target of an in-progress pointer drag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Capture {
    /// A leaf that accepted a press receives moves and the release
    Leaf(RegionId),
    /// A split whose handle is being dragged
    Splitter(RegionId),
}

/// Holds a region in the drawing state; dropping it leaves that state.
///
/// Dereferences to the tree so rendering can recurse while the guard is held.
pub struct DrawingGuard<'a> {
    tree: &'a mut RegionTree,
    id: RegionId,
}

impl Deref for DrawingGuard<'_> {
    type Target = RegionTree;

    fn deref(&self) -> &RegionTree {
        self.tree
    }
}

impl DerefMut for DrawingGuard<'_> {
    fn deref_mut(&mut self) -> &mut RegionTree {
        self.tree
    }
}

impl Drop for DrawingGuard<'_> {
    fn drop(&mut self) {
        if let Some(region) = self.tree.regions.get_mut(self.id) {
            region.end_drawing();
        }
    }
}

pub struct RegionTree {
    regions: SlotMap<RegionId, Region>,
    roots: Vec<RegionId>,
    config: TreeConfig,
    theme: Theme,
    next_editor: u64,
    capture: Option<Capture>,
    menu_action: ActionSlot,
}

impl Default for RegionTree {
    fn default() -> Self {
        Self::new(TreeConfig::default())
    }
}

impl RegionTree {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            regions: SlotMap::with_key(),
            roots: Vec::new(),
            config: config.sanitized(),
            theme: Theme::default(),
            next_editor: 1,
            capture: None,
            menu_action: Rc::new(Cell::new(None)),
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn roots(&self) -> &[RegionId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get_region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id)
    }

    pub fn get_region_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.regions.get_mut(id)
    }

    pub fn editor(&self, id: RegionId) -> Option<&Editor> {
        self.regions.get(id)?.editor()
    }

    pub fn editor_mut(&mut self, id: RegionId) -> Option<&mut Editor> {
        self.regions.get_mut(id)?.editor_mut()
    }

    /// Content bounds of a leaf (bounds minus header)
    pub fn content_bounds(&self, id: RegionId) -> Option<Rect> {
        let region = self.regions.get(id)?;
        Some(region.content_bounds(self.config.header_height))
    }

    fn new_editor(&mut self, kind: EditorKind) -> Editor {
        let id = EditorId(self.next_editor);
        self.next_editor += 1;
        Editor::new(id, kind)
    }

    // ========== Construction ==========

    /// Create a root leaf hosting a fresh editor of `kind`
    pub fn create_root(&mut self, bounds: Rect, kind: EditorKind) -> RegionId {
        let editor = self.new_editor(kind);
        let leaf = LeafContent::new(editor, &self.theme);
        let show_header = self.config.show_headers;
        let id = self.regions.insert_with_key(|id| {
            Region::new(id, bounds, None, RegionContent::Leaf(leaf), show_header)
        });
        self.roots.push(id);
        self.layout_header(id);
        log::debug!("created root region {id:?} ({kind:?}) at {bounds:?}");
        id
    }

    /// Remove a root region and its subtree. Non-root regions are removed by
    /// joining instead.
    pub fn destroy_region(&mut self, id: RegionId) -> bool {
        let Some(region) = self.regions.get(id) else {
            return false;
        };
        if region.parent.is_some() || region.is_drawing() {
            return false;
        }
        self.remove_subtree(id);
        self.roots.retain(|r| *r != id);
        log::debug!("destroyed region {id:?}");
        true
    }

    fn remove_subtree(&mut self, id: RegionId) {
        let Some(region) = self.regions.remove(id) else {
            return;
        };
        if matches!(self.capture, Some(Capture::Leaf(c) | Capture::Splitter(c)) if c == id) {
            self.capture = None;
        }
        if let RegionContent::Split(split) = region.content {
            for child in split.children {
                self.remove_subtree(child);
            }
        }
    }

    // ========== Split / join ==========

    /// Split a leaf into two children.
    ///
    /// The current editor moves to the first child and the second child gets
    /// a new Properties editor. Returns `None` without changing anything when
    /// the region is not a leaf, is drawing, or either child would be smaller
    /// than `min_region_size` once the splitter gap is taken out.
    pub fn split(
        &mut self,
        id: RegionId,
        direction: SplitDirection,
        ratio: f32,
    ) -> Option<(RegionId, RegionId)> {
        let region = self.regions.get(id)?;
        if !region.is_leaf() || region.is_drawing() {
            return None;
        }
        let ratio = clamp_ratio(ratio);
        let bounds = region.bounds;
        if !self.split_fits(&bounds, direction, ratio) {
            log::debug!("split of {id:?} rejected: {bounds:?} too small at ratio {ratio}");
            return None;
        }

        let (first_bounds, second_bounds) =
            split_bounds(&bounds, direction, ratio, self.config.splitter_gap);
        let second_editor = self.new_editor(EditorKind::Properties);
        let second_leaf = LeafContent::new(second_editor, &self.theme);
        let show_header = self.config.show_headers;

        let region = self.regions.get_mut(id)?;
        let show_first_header = region.show_header;
        let widgets = std::mem::take(&mut region.widgets);
        // Placeholder children are patched in below once the keys exist
        let old = std::mem::replace(
            &mut region.content,
            RegionContent::Split(SplitContent {
                direction,
                ratio,
                children: [RegionId::default(); 2],
                splitter: RegionSplitter::new(direction).with_tolerance(self.config.splitter_tolerance),
            }),
        );
        let RegionContent::Leaf(first_leaf) = old else {
            return None;
        };

        let first = self.regions.insert_with_key(|key| {
            Region::new(key, first_bounds, Some(id), RegionContent::Leaf(first_leaf), show_first_header)
        });
        let second = self.regions.insert_with_key(|key| {
            Region::new(key, second_bounds, Some(id), RegionContent::Leaf(second_leaf), show_header)
        });
        if let Some(first_region) = self.regions.get_mut(first) {
            first_region.widgets = widgets;
        }
        if let Some(RegionContent::Split(split)) = self.regions.get_mut(id).map(|r| &mut r.content) {
            split.children = [first, second];
        }
        self.layout_header(first);
        self.layout_header(second);
        self.mark(id, RegionFlags::LAYOUT_CHANGED);
        log::debug!("split {id:?} {direction:?} at {ratio} into {first:?} and {second:?}");
        Some((first, second))
    }

    /// Whether both children of splitting `bounds` at `ratio` would reach
    /// `min_region_size` once the splitter gap is taken out
    fn split_fits(&self, bounds: &Rect, direction: SplitDirection, ratio: f32) -> bool {
        let min = self.config.min_region_size;
        let (along, across) = match direction {
            SplitDirection::Horizontal => (bounds.height(), bounds.width()),
            SplitDirection::Vertical => (bounds.width(), bounds.height()),
        };
        let half_gap = self.config.splitter_gap * 0.5;
        along * ratio - half_gap >= min && along * (1.0 - ratio) - half_gap >= min && across >= min
    }

    /// Whether `join_with_sibling(id)` would succeed
    pub fn can_join(&self, id: RegionId) -> bool {
        let Some(parent_id) = self.regions.get(id).and_then(|r| r.parent) else {
            return false;
        };
        let Some(children) = self.regions.get(parent_id).and_then(Region::children) else {
            return false;
        };
        children.iter().all(|c| {
            self.regions
                .get(*c)
                .is_some_and(|r| r.is_leaf() && !r.is_drawing())
        }) && self.regions.get(parent_id).is_some_and(|p| !p.is_drawing())
    }

    /// Collapse the parent of `id` back into a leaf.
    ///
    /// The first child's editor is kept, which restores the editor that was
    /// split. Fails when `id` is a root, when either sibling is itself split,
    /// or while a region involved is drawing.
    pub fn join_with_sibling(&mut self, id: RegionId) -> bool {
        if !self.can_join(id) {
            log::debug!("join of {id:?} rejected");
            return false;
        }
        let Some(parent_id) = self.regions.get(id).and_then(|r| r.parent) else {
            return false;
        };
        let Some(children) = self.regions.get(parent_id).and_then(Region::children) else {
            return false;
        };

        let Some(mut first) = self.regions.remove(children[0]) else {
            return false;
        };
        self.regions.remove(children[1]);
        if matches!(self.capture, Some(Capture::Leaf(c) | Capture::Splitter(c)) if children.contains(&c) || c == parent_id)
        {
            self.capture = None;
        }

        let placeholder = RegionContent::Split(SplitContent {
            direction: SplitDirection::Horizontal,
            ratio: 0.5,
            children,
            splitter: RegionSplitter::new(SplitDirection::Horizontal),
        });
        let content = std::mem::replace(&mut first.content, placeholder);
        let Some(parent) = self.regions.get_mut(parent_id) else {
            return false;
        };
        parent.content = content;
        parent.show_header = first.show_header;
        parent.widgets = std::mem::take(&mut first.widgets);
        self.layout_header(parent_id);
        self.mark(parent_id, RegionFlags::LAYOUT_CHANGED | RegionFlags::CONTENT_CHANGED);
        log::debug!("joined {:?} into {parent_id:?}", children);
        true
    }

    /// Set a split's ratio and lay out its children again. The ratio is
    /// clamped to the splitter range and to what keeps both children at
    /// their minimum size.
    pub fn set_split_ratio(&mut self, id: RegionId, ratio: f32) -> bool {
        let Some(region) = self.regions.get(id) else {
            return false;
        };
        let RegionContent::Split(split) = &region.content else {
            return false;
        };
        let (bounds, direction, children) = (region.bounds, split.direction, split.children);
        let current = split.ratio;
        let ratio = self.fit_ratio(&bounds, direction, children, ratio);
        if current != ratio {
            if let Some(RegionContent::Split(split)) = self.regions.get_mut(id).map(|r| &mut r.content) {
                split.ratio = ratio;
            }
            self.layout_children(id, bounds);
            self.mark(id, RegionFlags::LAYOUT_CHANGED);
        }
        true
    }

    /// Smallest extent a subtree can take along `direction`'s split axis
    fn min_extent(&self, id: RegionId, direction: SplitDirection) -> f32 {
        let min = self.config.min_region_size;
        match self.regions.get(id).map(|r| &r.content) {
            Some(RegionContent::Split(split)) => {
                let [a, b] = split.children.map(|c| self.min_extent(c, direction));
                if split.direction == direction {
                    a + b + self.config.splitter_gap
                } else {
                    a.max(b)
                }
            }
            _ => min,
        }
    }

    /// Clamp `ratio` so neither child subtree drops below its minimum extent.
    /// When the parent is too small for both, only the plain ratio clamp
    /// applies and children shrink proportionally.
    fn fit_ratio(
        &self,
        bounds: &Rect,
        direction: SplitDirection,
        children: [RegionId; 2],
        ratio: f32,
    ) -> f32 {
        let ratio = clamp_ratio(ratio);
        let along = match direction {
            SplitDirection::Horizontal => bounds.height(),
            SplitDirection::Vertical => bounds.width(),
        };
        if along <= 0.0 {
            return ratio;
        }
        let half_gap = self.config.splitter_gap * 0.5;
        let lo = (self.min_extent(children[0], direction) + half_gap) / along;
        let hi = 1.0 - (self.min_extent(children[1], direction) + half_gap) / along;
        if lo > hi {
            return ratio;
        }
        clamp_ratio(ratio.clamp(lo, hi))
    }

    // ========== Layout ==========

    /// Move or resize a region and lay out its subtree proportionally
    pub fn set_bounds(&mut self, id: RegionId, bounds: Rect) {
        let Some(region) = self.regions.get_mut(id) else {
            return;
        };
        let old = region.bounds;
        if old == bounds {
            return;
        }
        region.bounds = bounds;
        let resized = old.size() != bounds.size();
        let flags = if resized {
            RegionFlags::SIZE_CHANGED | RegionFlags::LAYOUT_CHANGED
        } else {
            RegionFlags::LAYOUT_CHANGED
        };
        self.mark(id, flags);
        self.layout_header(id);
        self.layout_children(id, bounds);
    }

    fn layout_children(&mut self, id: RegionId, bounds: Rect) {
        let Some(RegionContent::Split(split)) = self.regions.get(id).map(|r| &r.content) else {
            return;
        };
        let (children, direction, current) = (split.children, split.direction, split.ratio);
        let ratio = self.fit_ratio(&bounds, direction, children, current);
        if ratio != current {
            log::debug!("split {id:?} ratio {current} -> {ratio} to keep children above minimum");
            if let Some(RegionContent::Split(split)) = self.regions.get_mut(id).map(|r| &mut r.content) {
                split.ratio = ratio;
            }
        }
        let (a, b) = split_bounds(&bounds, direction, ratio, self.config.splitter_gap);
        self.set_bounds(children[0], a);
        self.set_bounds(children[1], b);
    }

    fn layout_header(&mut self, id: RegionId) {
        let header_height = self.config.header_height;
        let Some(region) = self.regions.get_mut(id) else {
            return;
        };
        let Some(header) = region.header_rect(header_height) else {
            return;
        };
        if let RegionContent::Leaf(leaf) = &mut region.content {
            let width = (header.width() - 8.0).clamp(0.0, 160.0);
            leaf.header.set_bounds(Rect::from_min_size(
                [header.min[0] + 4.0, header.min[1] + 2.0],
                [width, (header_height - 4.0).max(0.0)],
            ));
        }
    }

    /// Deepest leaf whose bounds contain `point`. `None` outside every root
    /// and inside the gap between split children.
    pub fn find_region_at_point(&self, point: Point) -> Option<RegionId> {
        let mut current = self
            .roots
            .iter()
            .rev()
            .copied()
            .find(|r| self.regions.get(*r).is_some_and(|r| r.bounds.contains(point)))?;
        loop {
            let region = self.regions.get(current)?;
            match region.children() {
                None => return Some(current),
                Some(children) => {
                    current = children
                        .into_iter()
                        .find(|c| self.regions.get(*c).is_some_and(|r| r.bounds.contains(point)))?;
                }
            }
        }
    }

    /// Leaves in depth-first order
    pub fn leaves(&self) -> Vec<RegionId> {
        let mut out = Vec::new();
        for root in &self.roots {
            self.collect_leaves(*root, &mut out);
        }
        out
    }

    fn collect_leaves(&self, id: RegionId, out: &mut Vec<RegionId>) {
        match self.regions.get(id).map(Region::children) {
            Some(Some(children)) => {
                for child in children {
                    self.collect_leaves(child, out);
                }
            }
            Some(None) => out.push(id),
            None => {}
        }
    }

    // ========== Invalidation ==========

    /// Set `flags` on a region and `CHILD_CHANGED` on its ancestors
    pub fn mark(&mut self, id: RegionId, flags: RegionFlags) {
        let Some(region) = self.regions.get_mut(id) else {
            return;
        };
        region.set_flags(flags);
        let mut parent = region.parent;
        while let Some(p) = parent {
            let Some(region) = self.regions.get_mut(p) else {
                break;
            };
            region.set_flags(RegionFlags::CHILD_CHANGED);
            parent = region.parent;
        }
    }

    pub fn mark_all(&mut self, flags: RegionFlags) {
        for (_, region) in self.regions.iter_mut() {
            region.set_flags(flags);
        }
    }

    /// Replace a leaf's editor with a fresh one of `kind`
    pub fn set_editor_kind(&mut self, id: RegionId, kind: EditorKind) -> bool {
        if self.editor(id).is_none_or(|e| e.kind() == kind) {
            return false;
        }
        let editor = self.new_editor(kind);
        let Some(region) = self.regions.get_mut(id) else {
            return false;
        };
        let RegionContent::Leaf(leaf) = &mut region.content else {
            return false;
        };
        log::debug!("region {id:?} editor {:?} -> {kind:?}", leaf.editor.kind());
        leaf.editor = editor;
        leaf.header.set_selected(kind.index());
        self.mark(id, RegionFlags::CONTENT_CHANGED);
        true
    }

    pub fn set_theme(&mut self, theme: &Theme) {
        self.theme = theme.clone();
        for (_, region) in self.regions.iter_mut() {
            if let RegionContent::Leaf(leaf) = &mut region.content {
                leaf.refresh_header(theme);
            }
        }
        self.mark_all(RegionFlags::THEME_CHANGED);
    }

    fn apply_requested_kinds(&mut self) {
        let requests: Vec<(RegionId, EditorKind)> = self
            .regions
            .iter()
            .filter_map(|(id, region)| match &region.content {
                RegionContent::Leaf(leaf) => leaf.take_requested_kind().map(|kind| (id, kind)),
                RegionContent::Split(_) => None,
            })
            .collect();
        for (id, kind) in requests {
            self.set_editor_kind(id, kind);
        }
    }

    fn open_header(&self) -> Option<RegionId> {
        self.regions.iter().find_map(|(id, region)| {
            region.header().filter(|h| h.is_open()).map(|_| id)
        })
    }

    // ========== Context menu ==========

    /// Leaf whose context menu is open
    pub fn open_menu(&self) -> Option<RegionId> {
        self.regions
            .iter()
            .find(|(_, region)| region.widgets.has_visible_modal())
            .map(|(id, _)| id)
    }

    /// Open the split/join/editor menu of leaf `id` at `at`. The menu may
    /// extend over neighbouring regions but stays inside the root.
    pub fn open_region_menu(&mut self, id: RegionId, at: Point) -> bool {
        let Some(region) = self.regions.get(id) else {
            return false;
        };
        let Some(editor) = region.editor() else {
            return false;
        };
        let bounds = region.bounds;
        let context = MenuContext {
            split_horizontal: self.split_fits(&bounds, SplitDirection::Horizontal, 0.5),
            split_vertical: self.split_fits(&bounds, SplitDirection::Vertical, 0.5),
            join: self.can_join(id),
            current: editor.kind(),
        };
        let within = self.root_bounds(id).unwrap_or(bounds);

        let mut menu = region_menu(id, context, self.menu_action.clone());
        menu.open_at(at, within);
        let Some(region) = self.regions.get_mut(id) else {
            return false;
        };
        region.widgets.set_modal(Box::new(menu));
        self.mark_all(RegionFlags::OVERLAY_CHANGED);
        log::debug!("context menu opened on {id:?} at {at:?}");
        true
    }

    fn root_bounds(&self, id: RegionId) -> Option<Rect> {
        let mut region = self.regions.get(id)?;
        while let Some(parent) = region.parent {
            region = self.regions.get(parent)?;
        }
        Some(region.bounds)
    }

    fn apply_menu_action(&mut self) {
        let Some((id, action)) = self.menu_action.take() else {
            return;
        };
        log::debug!("context menu action {action:?} on {id:?}");
        match action {
            RegionAction::Split(direction) => {
                self.split(id, direction, 0.5);
            }
            RegionAction::Join => {
                self.join_with_sibling(id);
            }
            RegionAction::SetEditor(kind) => {
                self.set_editor_kind(id, kind);
            }
        }
    }

    // ========== Events ==========

    /// Route an event; returns true when something consumed it
    pub fn handle_event(&mut self, event: &InputEvent) -> bool {
        let handled = self.dispatch(event);
        self.apply_requested_kinds();
        self.apply_menu_action();
        handled
    }

    fn dispatch(&mut self, event: &InputEvent) -> bool {
        if let Some(capture) = self.capture {
            if event.is_pointer() {
                return self.handle_captured(capture, event);
            }
        }

        // An open context menu takes every event until it closes
        if let Some(id) = self.open_menu() {
            if let Some(region) = self.regions.get_mut(id) {
                region.widgets.handle_event(event);
                if !region.widgets.has_visible_modal() {
                    region.widgets.clear_modal();
                }
            }
            self.mark_all(RegionFlags::OVERLAY_CHANGED);
            return true;
        }

        // An open header list overlaps neighbouring regions, so it sees
        // events before normal routing.
        if let Some(id) = self.open_header() {
            let consumed = self
                .regions
                .get_mut(id)
                .and_then(|r| match &mut r.content {
                    RegionContent::Leaf(leaf) => Some(leaf.header.handle_event(event)),
                    RegionContent::Split(_) => None,
                })
                .unwrap_or(false);
            self.mark_all(RegionFlags::OVERLAY_CHANGED);
            if consumed {
                return true;
            }
        }

        if event.kind == InputEventKind::MouseMove {
            self.update_splitter_hover(event);
        }

        let Some(root) = self
            .roots
            .iter()
            .rev()
            .copied()
            .find(|r| self.regions.get(*r).is_some_and(|r| r.bounds.contains(event.position)))
        else {
            return false;
        };
        self.route(root, event)
    }

    fn route(&mut self, id: RegionId, event: &InputEvent) -> bool {
        let Some(region) = self.regions.get(id) else {
            return false;
        };
        let bounds = region.bounds;
        let split = match &region.content {
            RegionContent::Split(split) => Some((split.children, split.ratio)),
            RegionContent::Leaf(_) => None,
        };

        let Some((children, ratio)) = split else {
            return self.route_leaf(id, event);
        };

        for child in children {
            let inside = self
                .regions
                .get(child)
                .is_some_and(|r| r.bounds.contains(event.position));
            if inside && self.route(child, event) {
                return true;
            }
        }

        if !event.is_press_of(MouseButton::Left) {
            return false;
        }
        let Some(RegionContent::Split(split)) = self.regions.get_mut(id).map(|r| &mut r.content) else {
            return false;
        };
        if !split.splitter.hit_test(&bounds, ratio, event.position) {
            return false;
        }
        split.splitter.begin_drag(event.position, ratio);
        self.capture = Some(Capture::Splitter(id));
        self.mark(id, RegionFlags::OVERLAY_CHANGED);
        log::debug!("splitter drag start on {id:?}");
        true
    }

    fn route_leaf(&mut self, id: RegionId, event: &InputEvent) -> bool {
        let header_height = self.config.header_height;
        let Some(region) = self.regions.get_mut(id) else {
            return false;
        };
        let content_bounds = region.content_bounds(header_height);
        let header_rect = region.header_rect(header_height);
        let RegionContent::Leaf(leaf) = &mut region.content else {
            return false;
        };

        if header_rect.is_some_and(|h| h.contains(event.position)) && leaf.header.handle_event(event) {
            self.mark(id, RegionFlags::OVERLAY_CHANGED | RegionFlags::CONTENT_CHANGED);
            return true;
        }

        if region.widgets.handle_event(event) {
            self.mark(id, RegionFlags::CONTENT_CHANGED);
            return true;
        }

        if event.is_pointer() && !content_bounds.contains(event.position) {
            return false;
        }
        if event.is_press_of(MouseButton::Right) {
            return self.open_region_menu(id, event.position);
        }
        let Some(region) = self.regions.get_mut(id) else {
            return false;
        };
        let RegionContent::Leaf(leaf) = &mut region.content else {
            return false;
        };
        if !leaf.editor.handle_event(event, &content_bounds) {
            return false;
        }
        if event.kind == InputEventKind::MousePress {
            self.capture = Some(Capture::Leaf(id));
        }
        self.mark(id, RegionFlags::CONTENT_CHANGED);
        true
    }

    fn handle_captured(&mut self, capture: Capture, event: &InputEvent) -> bool {
        match capture {
            Capture::Splitter(id) => {
                let Some(region) = self.regions.get_mut(id) else {
                    self.capture = None;
                    return false;
                };
                let bounds = region.bounds;
                let RegionContent::Split(split) = &mut region.content else {
                    self.capture = None;
                    return false;
                };
                match event.kind {
                    InputEventKind::MouseMove => {
                        if let Some(ratio) = split.splitter.drag_ratio(event.position, &bounds) {
                            self.set_split_ratio(id, ratio);
                        }
                    }
                    InputEventKind::MouseRelease => {
                        split.splitter.end_drag();
                        split.splitter.set_hovered(false);
                        self.capture = None;
                        self.mark(id, RegionFlags::OVERLAY_CHANGED);
                        log::debug!("splitter drag end on {id:?}");
                    }
                    _ => {}
                }
                true
            }
            Capture::Leaf(id) => {
                let header_height = self.config.header_height;
                if event.kind == InputEventKind::MouseRelease {
                    self.capture = None;
                }
                let Some(region) = self.regions.get_mut(id) else {
                    self.capture = None;
                    return false;
                };
                let content_bounds = region.content_bounds(header_height);
                let handled = region
                    .editor_mut()
                    .is_some_and(|editor| editor.handle_event(event, &content_bounds));
                if handled {
                    self.mark(id, RegionFlags::CONTENT_CHANGED);
                }
                true
            }
        }
    }

    fn update_splitter_hover(&mut self, event: &InputEvent) {
        let mut changed = Vec::new();
        for (id, region) in self.regions.iter_mut() {
            let bounds = region.bounds;
            if let RegionContent::Split(split) = &mut region.content {
                let hovered = split.splitter.hit_test(&bounds, split.ratio, event.position);
                if hovered != split.splitter.is_hovered() {
                    split.splitter.set_hovered(hovered);
                    changed.push(id);
                }
            }
        }
        for id in changed {
            self.mark(id, RegionFlags::OVERLAY_CHANGED);
        }
    }

    /// Whether a pointer drag is captured by a leaf or splitter
    pub fn has_capture(&self) -> bool {
        self.capture.is_some()
    }

    // ========== Frame ==========

    /// Advance editor and widget animations; returns true if anything changed
    pub fn update(&mut self, dt: f32) -> bool {
        let mut changed = Vec::new();
        for (id, region) in self.regions.iter_mut() {
            region.widgets.update(dt);
            if region.editor_mut().is_some_and(|editor| editor.update(dt)) {
                changed.push(id);
            }
        }
        let any = !changed.is_empty();
        for id in changed {
            self.mark(id, RegionFlags::CONTENT_CHANGED);
        }
        any
    }

    /// Enter the drawing state for `id`. Returns `None` if the region does
    /// not exist or is already drawing.
    pub fn begin_draw(&mut self, id: RegionId) -> Option<DrawingGuard<'_>> {
        if !self.regions.get_mut(id)?.begin_drawing() {
            return None;
        }
        Some(DrawingGuard { tree: self, id })
    }

    /// Render every root. Returns the number of regions drawn.
    pub fn render(&mut self, renderer: &mut Renderer, theme: &Theme) -> usize {
        let roots = self.roots.clone();
        roots
            .into_iter()
            .map(|root| self.render_region(root, renderer, theme))
            .sum()
    }

    /// Render one region and its subtree. A region with no update bits, or
    /// one that is already drawing, draws nothing.
    pub fn render_region(&mut self, id: RegionId, renderer: &mut Renderer, theme: &Theme) -> usize {
        let Some(region) = self.regions.get(id) else {
            return 0;
        };
        if !region.needs_update() {
            return 0;
        }
        let Some(mut guard) = self.begin_draw(id) else {
            log::trace!("skipping re-entrant render of {id:?}");
            return 0;
        };
        guard.draw_locked(id, renderer, theme)
    }

    /// Body of a render while `id` holds the drawing state
    fn draw_locked(&mut self, id: RegionId, renderer: &mut Renderer, theme: &Theme) -> usize {
        let Some(region) = self.regions.get(id) else {
            return 0;
        };
        let bounds = region.bounds;
        let flags = region.flags();
        let split = match &region.content {
            RegionContent::Split(split) => Some((split.children, split.direction, split.ratio)),
            RegionContent::Leaf(_) => None,
        };

        match split {
            Some((children, direction, ratio)) => {
                // Children before this region's own splitter handle
                let mut drawn = 0;
                for child in children {
                    drawn += self.render_region(child, renderer, theme);
                }

                let gap = gap_rect(&bounds, direction, ratio, self.config.splitter_gap);
                renderer.draw_rect(gap, theme.splitter);
                renderer.add_dirty_rect(gap);
                if let Some(RegionContent::Split(split)) = self.regions.get(id).map(|r| &r.content) {
                    split.splitter.render(renderer, theme, &bounds, ratio);
                }

                let pending = children
                    .iter()
                    .any(|c| self.regions.get(*c).is_some_and(Region::needs_update));
                if let Some(region) = self.regions.get_mut(id) {
                    region.reset_update_flags(if pending {
                        RegionFlags::CHILD_CHANGED
                    } else {
                        RegionFlags::empty()
                    });
                }
                log::trace!("rendered split {id:?} ({flags:?})");
                drawn + 1
            }
            None => {
                self.draw_leaf(id, renderer, theme);
                log::trace!("rendered leaf {id:?} ({flags:?})");
                1
            }
        }
    }

    fn draw_leaf(&mut self, id: RegionId, renderer: &mut Renderer, theme: &Theme) {
        let header_height = self.config.header_height;
        let policy = self.config.redraw_policy;
        let Some(region) = self.regions.get_mut(id) else {
            return;
        };
        let bounds = region.bounds;
        let content_bounds = region.content_bounds(header_height);
        let header_rect = region.header_rect(header_height);
        renderer.add_dirty_rect(bounds);

        let RegionContent::Leaf(leaf) = &mut region.content else {
            return;
        };
        leaf.editor.render(renderer, theme, &content_bounds);
        region.widgets.render(renderer, theme);
        if let Some(menu) = region.widgets.modal().and_then(|m| region.widgets.get(m)) {
            if menu.is_visible() {
                renderer.add_dirty_rect(menu.hit_area());
            }
        }
        let RegionContent::Leaf(leaf) = &mut region.content else {
            return;
        };
        leaf.editor.render_overlay(renderer, theme, &content_bounds);

        if let Some(header) = header_rect {
            renderer.draw_rect(header, theme.header);
            renderer.draw_line_batched(
                Point::new(header.min[0], header.max[1] - 0.5),
                Point::new(header.max[0], header.max[1] - 0.5),
                1.0,
                theme.border,
            );
            leaf.header.render(renderer, theme);
            if leaf.header.is_open() {
                renderer.add_dirty_rect(leaf.header.hit_area());
            }
        }

        let keep = match policy {
            RedrawPolicy::Continuous => RegionFlags::CONTENT_CHANGED,
            RedrawPolicy::OnDemand if leaf.editor.is_animating() => RegionFlags::CONTENT_CHANGED,
            RedrawPolicy::OnDemand => RegionFlags::empty(),
        };
        region.reset_update_flags(keep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_ui::{HeadlessBackend, RendererConfig};

    fn renderer() -> Renderer {
        Renderer::new(Box::new(HeadlessBackend::new()), RendererConfig::default())
    }

    fn tree_with_root(w: f32, h: f32) -> (RegionTree, RegionId) {
        let mut tree = RegionTree::default();
        let root = tree.create_root(Rect::new([0.0, 0.0], [w, h]), EditorKind::Viewport3D);
        (tree, root)
    }

    #[test]
    fn test_split_moves_editor_to_first_child() {
        let (mut tree, root) = tree_with_root(400.0, 300.0);
        let editor_id = tree.editor(root).unwrap().id();
        let (first, second) = tree.split(root, SplitDirection::Vertical, 0.5).unwrap();
        assert_eq!(tree.editor(first).unwrap().id(), editor_id);
        assert_eq!(tree.editor(second).unwrap().kind(), EditorKind::Properties);
        assert!(tree.editor(root).is_none());
        assert_eq!(tree.get_region(first).unwrap().parent(), Some(root));
    }

    #[test]
    fn test_split_rejected_when_too_small() {
        let (mut tree, root) = tree_with_root(150.0, 300.0);
        assert!(tree.split(root, SplitDirection::Vertical, 0.5).is_none());
        assert!(tree.get_region(root).unwrap().is_leaf());
        assert!(tree.split(root, SplitDirection::Horizontal, 0.5).is_some());
        assert!(tree.split(root, SplitDirection::Horizontal, 0.5).is_none());
    }

    #[test]
    fn test_join_on_root_fails() {
        let (mut tree, root) = tree_with_root(400.0, 300.0);
        assert!(!tree.join_with_sibling(root));
    }

    #[test]
    fn test_join_rejects_nested_sibling() {
        let (mut tree, root) = tree_with_root(800.0, 600.0);
        let (first, second) = tree.split(root, SplitDirection::Vertical, 0.5).unwrap();
        tree.split(second, SplitDirection::Horizontal, 0.5).unwrap();
        assert!(!tree.join_with_sibling(first));
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_find_region_at_point() {
        let (mut tree, root) = tree_with_root(400.0, 300.0);
        let (first, second) = tree.split(root, SplitDirection::Vertical, 0.5).unwrap();
        assert_eq!(tree.find_region_at_point(Point::new(10.0, 10.0)), Some(first));
        assert_eq!(tree.find_region_at_point(Point::new(390.0, 10.0)), Some(second));
        assert_eq!(tree.find_region_at_point(Point::new(500.0, 10.0)), None);
    }

    #[test]
    fn test_marking_child_propagates_to_ancestors() {
        let (mut tree, root) = tree_with_root(400.0, 300.0);
        let (first, _) = tree.split(root, SplitDirection::Vertical, 0.5).unwrap();
        let mut renderer = renderer();
        renderer.begin_frame([400, 300]);
        tree.render(&mut renderer, &Theme::dark());
        assert!(!tree.get_region(root).unwrap().needs_update());

        tree.mark(first, RegionFlags::CONTENT_CHANGED);
        assert!(tree.get_region(root).unwrap().flags().contains(RegionFlags::CHILD_CHANGED));
    }

    #[test]
    fn test_clean_tree_renders_nothing() {
        let (mut tree, root) = tree_with_root(400.0, 300.0);
        tree.split(root, SplitDirection::Horizontal, 0.5);
        let mut renderer = renderer();
        let theme = Theme::dark();

        renderer.begin_frame([400, 300]);
        assert_eq!(tree.render(&mut renderer, &theme), 3);
        renderer.end_frame();

        renderer.begin_frame([400, 300]);
        assert_eq!(tree.render(&mut renderer, &theme), 0);
        let stats = renderer.end_frame();
        assert_eq!(stats.vertices, 0);
    }

    #[test]
    fn test_only_dirty_leaf_is_redrawn() {
        let (mut tree, root) = tree_with_root(400.0, 300.0);
        let (first, _) = tree.split(root, SplitDirection::Horizontal, 0.5).unwrap();
        let mut renderer = renderer();
        let theme = Theme::dark();
        renderer.begin_frame([400, 300]);
        tree.render(&mut renderer, &theme);
        renderer.end_frame();

        tree.mark(first, RegionFlags::CONTENT_CHANGED);
        renderer.begin_frame([400, 300]);
        // The dirty leaf and its parent split
        assert_eq!(tree.render(&mut renderer, &theme), 2);
        renderer.end_frame();
    }

    #[test]
    fn test_continuous_policy_keeps_content_flag() {
        let mut tree = RegionTree::new(TreeConfig::default().with_redraw_policy(RedrawPolicy::Continuous));
        let root = tree.create_root(Rect::new([0.0, 0.0], [400.0, 300.0]), EditorKind::Outliner);
        let mut renderer = renderer();
        renderer.begin_frame([400, 300]);
        tree.render(&mut renderer, &Theme::dark());
        assert_eq!(tree.get_region(root).unwrap().flags(), RegionFlags::CONTENT_CHANGED);
    }

    #[test]
    fn test_splitter_drag_changes_ratio() {
        let (mut tree, root) = tree_with_root(400.0, 300.0);
        tree.split(root, SplitDirection::Vertical, 0.5).unwrap();
        // Inside the gap so no child sees the press
        let press = InputEvent::mouse_press(Point::new(200.0, 150.0), MouseButton::Left);
        assert!(tree.handle_event(&press));
        assert!(tree.has_capture());

        tree.handle_event(&InputEvent::mouse_move(Point::new(240.0, 150.0), Point::new(40.0, 0.0)));
        let ratio = tree.get_region(root).unwrap().split_ratio().unwrap();
        assert!((ratio - 0.6).abs() < 1e-5);

        tree.handle_event(&InputEvent::mouse_release(Point::new(240.0, 150.0), MouseButton::Left));
        assert!(!tree.has_capture());
    }

    #[test]
    fn test_leaf_capture_follows_drag_outside() {
        let (mut tree, root) = tree_with_root(400.0, 300.0);
        let (first, _) = tree.split(root, SplitDirection::Vertical, 0.5).unwrap();
        let press = InputEvent::mouse_press(Point::new(100.0, 150.0), MouseButton::Middle);
        assert!(tree.handle_event(&press));
        let before = tree.editor(first).unwrap().events_received();

        // Far into the second child: still goes to the first
        tree.handle_event(&InputEvent::mouse_move(Point::new(350.0, 150.0), Point::new(250.0, 0.0)));
        assert_eq!(tree.editor(first).unwrap().events_received(), before + 1);
        tree.handle_event(&InputEvent::mouse_release(Point::new(350.0, 150.0), MouseButton::Middle));
        assert!(!tree.has_capture());
    }

    #[test]
    fn test_header_dropdown_switches_editor() {
        let (mut tree, root) = tree_with_root(400.0, 300.0);
        let header = tree.get_region(root).unwrap().header().unwrap().bounds();
        let at = header.center();
        tree.handle_event(&InputEvent::mouse_press(at, MouseButton::Left));
        tree.handle_event(&InputEvent::mouse_release(at, MouseButton::Left));
        assert!(tree.get_region(root).unwrap().header().unwrap().is_open());

        let list = tree.get_region(root).unwrap().header().unwrap().list_rect();
        let item_height = list.height() / EditorKind::ALL.len() as f32;
        let outliner = Point::new(list.min[0] + 10.0, list.min[1] + item_height * 2.5);
        tree.handle_event(&InputEvent::mouse_release(outliner, MouseButton::Left));
        assert_eq!(tree.editor(root).unwrap().kind(), EditorKind::Outliner);
    }

    #[test]
    fn test_destroy_root_removes_subtree() {
        let (mut tree, root) = tree_with_root(400.0, 300.0);
        let (first, _) = tree.split(root, SplitDirection::Vertical, 0.5).unwrap();
        assert!(!tree.destroy_region(first));
        assert!(tree.destroy_region(root));
        assert!(tree.is_empty());
        assert!(tree.roots().is_empty());
    }
}
