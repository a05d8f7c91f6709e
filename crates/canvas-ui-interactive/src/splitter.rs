use canvas_ui::{Point, Rect, Renderer, ShaderKind, Theme, WidgetInstance};

pub const MIN_SPLIT_RATIO: f32 = 0.1;
pub const MAX_SPLIT_RATIO: f32 = 0.9;
pub const DEFAULT_SPLITTER_TOLERANCE: f32 = 4.0;

/// Orientation of a split.
///
/// `Horizontal` divides with a horizontal line: children are stacked top and
/// bottom. `Vertical` divides with a vertical line: children sit side by side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SplitDirection {
    Horizontal,
    Vertical,
}

impl SplitDirection {
    /// Extent of `rect` along the drag axis
    pub fn extent(&self, rect: &Rect) -> f32 {
        match self {
            SplitDirection::Horizontal => rect.height(),
            SplitDirection::Vertical => rect.width(),
        }
    }

    /// Coordinate of `point` along the drag axis
    pub fn axis_of(&self, point: Point) -> f32 {
        match self {
            SplitDirection::Horizontal => point.y,
            SplitDirection::Vertical => point.x,
        }
    }
}

pub fn clamp_ratio(ratio: f32) -> f32 {
    if ratio.is_nan() {
        return 0.5;
    }
    ratio.clamp(MIN_SPLIT_RATIO, MAX_SPLIT_RATIO)
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Drag {
    start_ratio: f32,
    start_axis: f32,
}

/// Hit-testing and drag state for the handle between two split children.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionSplitter {
    pub direction: SplitDirection,
    pub tolerance: f32,
    drag: Option<Drag>,
    hovered: bool,
}

impl RegionSplitter {
    pub fn new(direction: SplitDirection) -> Self {
        Self {
            direction,
            tolerance: DEFAULT_SPLITTER_TOLERANCE,
            drag: None,
            hovered: false,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Position of the split line inside `parent` for `ratio`
    pub fn line_position(&self, parent: &Rect, ratio: f32) -> f32 {
        match self.direction {
            SplitDirection::Horizontal => parent.min[1] + parent.height() * ratio,
            SplitDirection::Vertical => parent.min[0] + parent.width() * ratio,
        }
    }

    /// Band of +-`tolerance` around the split line
    pub fn handle_rect(&self, parent: &Rect, ratio: f32) -> Rect {
        let line = self.line_position(parent, ratio);
        match self.direction {
            SplitDirection::Horizontal => Rect::new(
                [parent.min[0], line - self.tolerance],
                [parent.max[0], line + self.tolerance],
            ),
            SplitDirection::Vertical => Rect::new(
                [line - self.tolerance, parent.min[1]],
                [line + self.tolerance, parent.max[1]],
            ),
        }
    }

    pub fn hit_test(&self, parent: &Rect, ratio: f32, point: Point) -> bool {
        self.handle_rect(parent, ratio).contains(point)
    }

    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn begin_drag(&mut self, point: Point, current_ratio: f32) {
        self.drag = Some(Drag {
            start_ratio: current_ratio,
            start_axis: self.direction.axis_of(point),
        });
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// New ratio for the pointer at `point`: `start_ratio + delta / extent`,
    /// clamped. Returns `None` when not dragging or the parent has no extent.
    pub fn drag_ratio(&self, point: Point, parent: &Rect) -> Option<f32> {
        let drag = self.drag?;
        let extent = self.direction.extent(parent);
        if extent <= 0.0 {
            return None;
        }
        let delta = self.direction.axis_of(point) - drag.start_axis;
        Some(clamp_ratio(drag.start_ratio + delta / extent))
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn render(&self, renderer: &mut Renderer, theme: &Theme, parent: &Rect, ratio: f32) {
        if !self.hovered && !self.is_dragging() {
            return;
        }
        let line = self.line_position(parent, ratio);
        let (from, to) = match self.direction {
            SplitDirection::Horizontal => (
                Point::new(parent.min[0], line),
                Point::new(parent.max[0], line),
            ),
            SplitDirection::Vertical => (
                Point::new(line, parent.min[1]),
                Point::new(line, parent.max[1]),
            ),
        };

        if !renderer.is_valid(ShaderKind::WidgetInstance) {
            renderer.draw_line_batched(from, to, 2.0, theme.splitter_active);
            return;
        }
        // Instanced draws follow the frame's batches. The bar stays inside
        // the gap, the only area a split marks dirty.
        let bar = match self.direction {
            SplitDirection::Horizontal => Rect::new([from.x, line - 1.0], [to.x, line + 1.0]),
            SplitDirection::Vertical => Rect::new([line - 1.0, from.y], [line + 1.0, to.y]),
        };
        renderer.add_widget_instance(WidgetInstance::from_rect(bar, theme.splitter_active));
    }
}
