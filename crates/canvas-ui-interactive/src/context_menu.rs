use canvas_ui::{
    InputEvent, InputEventKind, Layer, MouseButton, NamedKey, Point, Rect, Renderer, TextStyle,
    Theme, WidgetRenderFlags,
};

const ITEM_HEIGHT: f32 = 22.0;
const SEPARATOR_HEIGHT: f32 = 8.0;
const MENU_WIDTH: f32 = 180.0;
const PADDING: f32 = 8.0;

#[derive(Clone, Debug, PartialEq)]
pub enum MenuEntry {
    Item { label: String, enabled: bool },
    Separator,
}

impl MenuEntry {
    pub fn item(label: impl Into<String>) -> Self {
        MenuEntry::Item {
            label: label.into(),
            enabled: true,
        }
    }

    pub fn disabled(label: impl Into<String>) -> Self {
        MenuEntry::Item {
            label: label.into(),
            enabled: false,
        }
    }

    fn height(&self) -> f32 {
        match self {
            MenuEntry::Item { .. } => ITEM_HEIGHT,
            MenuEntry::Separator => SEPARATOR_HEIGHT,
        }
    }

    fn is_selectable(&self) -> bool {
        matches!(self, MenuEntry::Item { enabled: true, .. })
    }
}

/// Popup menu opened at a point.
///
/// Commits on release over an enabled item; an outside press or Escape
/// closes it without a selection.
pub struct ContextMenu {
    entries: Vec<MenuEntry>,
    bounds: Rect,
    open: bool,
    hovered: Option<usize>,
    on_select: Option<Box<dyn FnMut(usize)>>,
}

impl ContextMenu {
    pub fn new(entries: Vec<MenuEntry>) -> Self {
        Self {
            entries,
            bounds: Rect::ZERO,
            open: false,
            hovered: None,
            on_select: None,
        }
    }

    pub fn on_select(mut self, f: impl FnMut(usize) + 'static) -> Self {
        self.on_select = Some(Box::new(f));
        self
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    fn content_height(&self) -> f32 {
        self.entries.iter().map(MenuEntry::height).sum()
    }

    /// Open with the top-left corner at `point`, shifted to stay inside `within`
    pub fn open_at(&mut self, point: Point, within: Rect) {
        let size = [MENU_WIDTH, self.content_height()];
        let x = point.x.min(within.max[0] - size[0]).max(within.min[0]);
        let y = point.y.min(within.max[1] - size[1]).max(within.min[1]);
        self.bounds = Rect::from_min_size([x, y], size);
        self.open = true;
        self.hovered = None;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.hovered = None;
    }

    /// Entry index under `point`, including separators and disabled items
    pub fn entry_at(&self, point: Point) -> Option<usize> {
        if !self.open || !self.bounds.contains(point) {
            return None;
        }
        let mut top = self.bounds.min[1];
        for (index, entry) in self.entries.iter().enumerate() {
            let bottom = top + entry.height();
            if point.y < bottom {
                return Some(index);
            }
            top = bottom;
        }
        None
    }

    fn selectable_at(&self, point: Point) -> Option<usize> {
        self.entry_at(point)
            .filter(|&index| self.entries[index].is_selectable())
    }
}

impl crate::Widget for ContextMenu {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    fn is_visible(&self) -> bool {
        self.open
    }

    fn handle_event(&mut self, event: &InputEvent) -> bool {
        if !self.open {
            return false;
        }
        let inside = self.bounds.contains(event.position);
        match event.kind {
            InputEventKind::MouseMove => {
                self.hovered = self.selectable_at(event.position);
                inside
            }
            InputEventKind::MousePress => {
                if !inside {
                    self.close();
                }
                true
            }
            InputEventKind::MouseRelease if event.button == Some(MouseButton::Left) => {
                if let Some(index) = self.selectable_at(event.position) {
                    self.close();
                    if let Some(ref mut on_select) = self.on_select {
                        on_select(index);
                    }
                }
                true
            }
            InputEventKind::KeyPress if event.is_named_key_press(NamedKey::Escape) => {
                self.close();
                true
            }
            _ => inside,
        }
    }

    fn render(&mut self, renderer: &mut Renderer, theme: &Theme) {
        if !self.open {
            return;
        }
        let text_style = TextStyle::sized(12.0);
        renderer.with_layer(Layer::Overlay, |renderer| {
            renderer.draw_shadow(self.bounds, 8.0, 0.0, [0.0, 4.0], theme.shadow);
            renderer.draw_rounded_rect(self.bounds, 4.0, theme.panel, Some((1.0, theme.border)));

            let mut top = self.bounds.min[1];
            for (index, entry) in self.entries.iter().enumerate() {
                let height = entry.height();
                let row = Rect::from_min_size([self.bounds.min[0], top], [self.bounds.width(), height]);
                match entry {
                    MenuEntry::Separator => {
                        let y = row.center().y;
                        renderer.draw_line_batched(
                            Point::new(row.min[0] + PADDING, y),
                            Point::new(row.max[0] - PADDING, y),
                            1.0,
                            theme.border,
                        );
                    }
                    MenuEntry::Item { label, enabled } => {
                        if self.hovered == Some(index) {
                            renderer.draw_rect(row.shrink(1.0), theme.hover_background);
                        }
                        let color = if *enabled {
                            theme.text_primary
                        } else {
                            theme.text_secondary
                        };
                        renderer.draw_text(
                            label,
                            Point::new(row.min[0] + PADDING, row.center().y - 7.0),
                            &text_style,
                            color,
                        );
                    }
                }
                top += height;
            }
        });
    }

    fn render_flags(&self) -> WidgetRenderFlags {
        WidgetRenderFlags::HAS_SHADOW
    }
}
