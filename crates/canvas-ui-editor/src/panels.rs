//! State and drawing for the non-viewport editor spaces.
//!
//! Each panel receives its content bounds on every call and owns no layout.

use canvas_ui::{
    Color, InputEvent, InputEventKind, Key, MouseButton, NamedKey, Point, Rect, Renderer,
    TextStyle, Theme,
};

pub const ROW_HEIGHT: f32 = 20.0;
const PADDING: f32 = 8.0;
const FONT_SIZE: f32 = 12.0;

fn label(renderer: &mut Renderer, text: &str, x: f32, row: &Rect, color: Color) {
    renderer.draw_text(
        text,
        Point::new(x, row.center().y - FONT_SIZE * 0.6),
        &TextStyle::sized(FONT_SIZE),
        color,
    );
}

fn row_rect(bounds: &Rect, index: usize, scroll: f32) -> Rect {
    Rect::from_min_size(
        [bounds.min[0], bounds.min[1] + index as f32 * ROW_HEIGHT - scroll],
        [bounds.width(), ROW_HEIGHT],
    )
}

/// Row index under `point` for a list scrolled by `scroll` pixels
fn row_at(bounds: &Rect, point: Point, scroll: f32, rows: usize) -> Option<usize> {
    if !bounds.contains(point) {
        return None;
    }
    let index = ((point.y - bounds.min[1] + scroll) / ROW_HEIGHT).floor();
    (index >= 0.0 && (index as usize) < rows).then_some(index as usize)
}

fn max_scroll(rows: usize, bounds: &Rect) -> f32 {
    (rows as f32 * ROW_HEIGHT - bounds.height()).max(0.0)
}

fn wheel_lines(event: &InputEvent) -> f32 {
    match event.kind {
        InputEventKind::MouseWheel | InputEventKind::TrackpadPan => event.delta.y,
        _ => 0.0,
    }
}

// ========== Properties ==========

#[derive(Clone, Debug, PartialEq)]
pub struct PropertySection {
    pub title: String,
    pub rows: Vec<(String, String)>,
    pub expanded: bool,
}

impl PropertySection {
    pub fn new(title: impl Into<String>, rows: &[(&str, &str)]) -> Self {
        Self {
            title: title.into(),
            rows: rows
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            expanded: true,
        }
    }
}

/// Collapsible key/value sections with vertical scrolling
#[derive(Clone, Debug, PartialEq)]
pub struct PropertiesPanel {
    pub sections: Vec<PropertySection>,
    pub scroll: f32,
}

impl Default for PropertiesPanel {
    fn default() -> Self {
        Self {
            sections: vec![
                PropertySection::new(
                    "Transform",
                    &[("Location", "0, 0, 0"), ("Rotation", "0, 0, 0"), ("Scale", "1, 1, 1")],
                ),
                PropertySection::new("Voxel", &[("Size", "1.0"), ("Material", "Default")]),
                PropertySection::new("Display", &[("Wireframe", "Off"), ("Bounds", "Off")]),
            ],
            scroll: 0.0,
        }
    }
}

/// One visible line of the properties list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyRow {
    Header(usize),
    Field(usize, usize),
}

impl PropertiesPanel {
    pub fn visible_rows(&self) -> Vec<PropertyRow> {
        let mut rows = Vec::new();
        for (s, section) in self.sections.iter().enumerate() {
            rows.push(PropertyRow::Header(s));
            if section.expanded {
                rows.extend((0..section.rows.len()).map(|r| PropertyRow::Field(s, r)));
            }
        }
        rows
    }

    pub fn handle_event(&mut self, event: &InputEvent, bounds: &Rect) -> bool {
        let rows = self.visible_rows();
        match event.kind {
            InputEventKind::MouseWheel | InputEventKind::TrackpadPan
                if bounds.contains(event.position) =>
            {
                let scroll = (self.scroll - wheel_lines(event) * ROW_HEIGHT)
                    .clamp(0.0, max_scroll(rows.len(), bounds));
                let changed = scroll != self.scroll;
                self.scroll = scroll;
                changed
            }
            InputEventKind::MousePress if event.button == Some(MouseButton::Left) => {
                match row_at(bounds, event.position, self.scroll, rows.len()).map(|i| rows[i]) {
                    Some(PropertyRow::Header(s)) => {
                        self.sections[s].expanded = !self.sections[s].expanded;
                        let total = self.visible_rows().len();
                        self.scroll = self.scroll.min(max_scroll(total, bounds));
                        true
                    }
                    Some(PropertyRow::Field(..)) => true,
                    None => false,
                }
            }
            _ => false,
        }
    }

    pub fn render(&self, renderer: &mut Renderer, theme: &Theme, bounds: &Rect) {
        for (index, row) in self.visible_rows().into_iter().enumerate() {
            let rect = row_rect(bounds, index, self.scroll);
            if !rect.intersects(bounds) {
                continue;
            }
            match row {
                PropertyRow::Header(s) => {
                    let section = &self.sections[s];
                    renderer.draw_rect(rect.shrink(1.0), theme.header);
                    let marker = if section.expanded { "v" } else { ">" };
                    label(renderer, marker, rect.min[0] + PADDING, &rect, theme.text_secondary);
                    label(renderer, &section.title, rect.min[0] + PADDING * 3.0, &rect, theme.text_primary);
                }
                PropertyRow::Field(s, r) => {
                    let (key, value) = &self.sections[s].rows[r];
                    let split = rect.min[0] + rect.width() * 0.4;
                    label(renderer, key, rect.min[0] + PADDING * 3.0, &rect, theme.text_secondary);
                    label(renderer, value, split, &rect, theme.text_primary);
                }
            }
        }
    }
}

// ========== Outliner ==========

#[derive(Clone, Debug, PartialEq)]
pub struct OutlinerItem {
    pub name: String,
    pub depth: usize,
    pub visible: bool,
}

impl OutlinerItem {
    pub fn new(name: impl Into<String>, depth: usize) -> Self {
        Self {
            name: name.into(),
            depth,
            visible: true,
        }
    }
}

/// Scene hierarchy list with single selection
#[derive(Clone, Debug, PartialEq)]
pub struct OutlinerPanel {
    pub items: Vec<OutlinerItem>,
    pub selected: Option<usize>,
    pub scroll: f32,
}

impl Default for OutlinerPanel {
    fn default() -> Self {
        Self {
            items: vec![
                OutlinerItem::new("Scene", 0),
                OutlinerItem::new("Camera", 1),
                OutlinerItem::new("Light", 1),
                OutlinerItem::new("Terrain", 1),
                OutlinerItem::new("Chunk 0", 2),
                OutlinerItem::new("Chunk 1", 2),
            ],
            selected: None,
            scroll: 0.0,
        }
    }
}

impl OutlinerPanel {
    /// Move the selection by `step` rows, starting at the top when empty
    pub fn step_selection(&mut self, step: isize) {
        if self.items.is_empty() {
            return;
        }
        let last = self.items.len() as isize - 1;
        let next = match self.selected {
            Some(current) => (current as isize + step).clamp(0, last),
            None => 0,
        };
        self.selected = Some(next as usize);
    }

    pub fn handle_event(&mut self, event: &InputEvent, bounds: &Rect) -> bool {
        match event.kind {
            InputEventKind::MousePress if event.button == Some(MouseButton::Left) => {
                let Some(index) = row_at(bounds, event.position, self.scroll, self.items.len()) else {
                    return false;
                };
                self.selected = Some(index);
                true
            }
            InputEventKind::KeyPress if event.is_named_key_press(NamedKey::ArrowDown) => {
                self.step_selection(1);
                true
            }
            InputEventKind::KeyPress if event.is_named_key_press(NamedKey::ArrowUp) => {
                self.step_selection(-1);
                true
            }
            InputEventKind::KeyPress if event.key.as_ref().is_some_and(|k| k.is_char('h')) => {
                match self.selected.and_then(|i| self.items.get_mut(i)) {
                    Some(item) => {
                        item.visible = !item.visible;
                        true
                    }
                    None => false,
                }
            }
            InputEventKind::MouseWheel | InputEventKind::TrackpadPan
                if bounds.contains(event.position) =>
            {
                let scroll = (self.scroll - wheel_lines(event) * ROW_HEIGHT)
                    .clamp(0.0, max_scroll(self.items.len(), bounds));
                let changed = scroll != self.scroll;
                self.scroll = scroll;
                changed
            }
            _ => false,
        }
    }

    pub fn render(&self, renderer: &mut Renderer, theme: &Theme, bounds: &Rect) {
        for (index, item) in self.items.iter().enumerate() {
            let rect = row_rect(bounds, index, self.scroll);
            if !rect.intersects(bounds) {
                continue;
            }
            if self.selected == Some(index) {
                renderer.draw_rect(rect, theme.accent.with_alpha(0.35));
            }
            let color = if item.visible {
                theme.text_primary
            } else {
                theme.text_secondary
            };
            let x = rect.min[0] + PADDING + item.depth as f32 * 14.0;
            label(renderer, &item.name, x, &rect, color);
        }
    }
}

// ========== Timeline ==========

/// Frame range with a playhead
#[derive(Clone, Debug, PartialEq)]
pub struct TimelinePanel {
    pub start: i32,
    pub end: i32,
    /// Fractional so playback accumulates sub-frame time
    pub current: f32,
    pub playing: bool,
    pub fps: f32,
    scrubbing: bool,
}

impl Default for TimelinePanel {
    fn default() -> Self {
        Self {
            start: 1,
            end: 250,
            current: 1.0,
            playing: false,
            fps: 24.0,
            scrubbing: false,
        }
    }
}

impl TimelinePanel {
    pub fn current_frame(&self) -> i32 {
        self.current.floor() as i32
    }

    pub fn set_frame(&mut self, frame: f32) {
        self.current = frame.clamp(self.start as f32, self.end as f32);
    }

    fn frame_at(&self, x: f32, bounds: &Rect) -> f32 {
        let usable = (bounds.width() - 2.0 * PADDING).max(1.0);
        let t = ((x - bounds.min[0] - PADDING) / usable).clamp(0.0, 1.0);
        (self.start as f32 + t * (self.end - self.start) as f32).round()
    }

    fn frame_x(&self, frame: f32, bounds: &Rect) -> f32 {
        let span = (self.end - self.start).max(1) as f32;
        let usable = bounds.width() - 2.0 * PADDING;
        bounds.min[0] + PADDING + (frame - self.start as f32) / span * usable
    }

    pub fn handle_event(&mut self, event: &InputEvent, bounds: &Rect) -> bool {
        match event.kind {
            InputEventKind::KeyPress if event.is_named_key_press(NamedKey::Space) => {
                self.playing = !self.playing;
                true
            }
            InputEventKind::KeyPress if event.is_named_key_press(NamedKey::ArrowRight) => {
                self.set_frame(self.current.floor() + 1.0);
                true
            }
            InputEventKind::KeyPress if event.is_named_key_press(NamedKey::ArrowLeft) => {
                self.set_frame(self.current.floor() - 1.0);
                true
            }
            InputEventKind::MousePress
                if event.button == Some(MouseButton::Left) && bounds.contains(event.position) =>
            {
                self.scrubbing = true;
                self.set_frame(self.frame_at(event.position.x, bounds));
                true
            }
            InputEventKind::MouseMove if self.scrubbing => {
                self.set_frame(self.frame_at(event.position.x, bounds));
                true
            }
            InputEventKind::MouseRelease if self.scrubbing => {
                self.scrubbing = false;
                true
            }
            _ => false,
        }
    }

    /// Advance playback, wrapping at the end of the range
    pub fn update(&mut self, dt: f32) -> bool {
        if !self.playing || self.end <= self.start {
            return false;
        }
        let span = (self.end - self.start + 1) as f32;
        let mut next = self.current + dt * self.fps;
        while next >= self.end as f32 + 1.0 {
            next -= span;
        }
        self.current = next;
        true
    }

    pub fn render(&self, renderer: &mut Renderer, theme: &Theme, bounds: &Rect) {
        let span = (self.end - self.start).max(1);
        let step = match span {
            0..=60 => 5,
            61..=300 => 10,
            301..=1200 => 50,
            _ => 100,
        };
        let ruler = Rect::from_min_size(bounds.min, [bounds.width(), ROW_HEIGHT]);
        renderer.draw_rect(ruler, theme.header);

        let first = (self.start + step - 1) / step * step;
        for frame in (first..=self.end).step_by(step as usize) {
            let x = self.frame_x(frame as f32, bounds);
            renderer.draw_line_batched(
                Point::new(x, ruler.max[1]),
                Point::new(x, bounds.max[1]),
                1.0,
                theme.grid_minor,
            );
            label(renderer, &frame.to_string(), x + 2.0, &ruler, theme.text_secondary);
        }

        let x = self.frame_x(self.current.floor(), bounds);
        renderer.draw_line_batched(Point::new(x, bounds.min[1]), Point::new(x, bounds.max[1]), 2.0, theme.accent);
        let badge = Rect::from_center_size(Point::new(x, ruler.center().y), [34.0, ROW_HEIGHT - 4.0]);
        renderer.draw_rounded_rect(badge, 3.0, theme.accent, None);
        label(renderer, &self.current_frame().to_string(), badge.min[0] + 4.0, &badge, theme.background);
    }
}

// ========== Material editor ==========

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialNode {
    pub title: String,
    /// Position in graph space
    pub position: Point,
}

/// Pannable, zoomable node canvas
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialEditorPanel {
    pub nodes: Vec<MaterialNode>,
    pub zoom: f32,
    pub pan: [f32; 2],
    pan_from: Option<Point>,
}

pub const NODE_SIZE: [f32; 2] = [140.0, 80.0];

impl Default for MaterialEditorPanel {
    fn default() -> Self {
        Self {
            nodes: vec![
                MaterialNode {
                    title: "Voxel Color".into(),
                    position: Point::new(40.0, 40.0),
                },
                MaterialNode {
                    title: "Principled".into(),
                    position: Point::new(240.0, 60.0),
                },
                MaterialNode {
                    title: "Output".into(),
                    position: Point::new(440.0, 60.0),
                },
            ],
            zoom: 1.0,
            pan: [0.0, 0.0],
            pan_from: None,
        }
    }
}

impl MaterialEditorPanel {
    pub fn to_screen(&self, graph: Point, bounds: &Rect) -> Point {
        Point::new(
            bounds.min[0] + (graph.x + self.pan[0]) * self.zoom,
            bounds.min[1] + (graph.y + self.pan[1]) * self.zoom,
        )
    }

    pub fn handle_event(&mut self, event: &InputEvent, bounds: &Rect) -> bool {
        match event.kind {
            InputEventKind::MouseWheel if bounds.contains(event.position) => {
                let zoom = (self.zoom * 1.1f32.powf(event.delta.y)).clamp(0.2, 4.0);
                if zoom == self.zoom {
                    return false;
                }
                // Keep the graph point under the cursor fixed
                let gx = (event.position.x - bounds.min[0]) / self.zoom - self.pan[0];
                let gy = (event.position.y - bounds.min[1]) / self.zoom - self.pan[1];
                self.zoom = zoom;
                self.pan = [
                    (event.position.x - bounds.min[0]) / zoom - gx,
                    (event.position.y - bounds.min[1]) / zoom - gy,
                ];
                true
            }
            InputEventKind::MousePress
                if event.button == Some(MouseButton::Middle) && bounds.contains(event.position) =>
            {
                self.pan_from = Some(event.position);
                true
            }
            InputEventKind::MouseMove => match self.pan_from {
                Some(from) => {
                    self.pan[0] += (event.position.x - from.x) / self.zoom;
                    self.pan[1] += (event.position.y - from.y) / self.zoom;
                    self.pan_from = Some(event.position);
                    true
                }
                None => false,
            },
            InputEventKind::MouseRelease if event.button == Some(MouseButton::Middle) => {
                self.pan_from.take().is_some()
            }
            InputEventKind::KeyPress if event.is_named_key_press(NamedKey::Home) => {
                self.zoom = 1.0;
                self.pan = [0.0, 0.0];
                true
            }
            _ => false,
        }
    }

    pub fn render(&self, renderer: &mut Renderer, theme: &Theme, bounds: &Rect) {
        renderer.with_clip(*bounds, |renderer| {
            for pair in self.nodes.windows(2) {
                let from = self.to_screen(
                    Point::new(pair[0].position.x + NODE_SIZE[0], pair[0].position.y + NODE_SIZE[1] * 0.5),
                    bounds,
                );
                let to = self.to_screen(
                    Point::new(pair[1].position.x, pair[1].position.y + NODE_SIZE[1] * 0.5),
                    bounds,
                );
                renderer.draw_line_batched(from, to, 2.0 * self.zoom, theme.text_secondary);
            }
            for node in &self.nodes {
                let min = self.to_screen(node.position, bounds);
                let rect = Rect::from_min_size(
                    [min.x, min.y],
                    [NODE_SIZE[0] * self.zoom, NODE_SIZE[1] * self.zoom],
                );
                renderer.draw_shadow(rect, 6.0, 0.0, [0.0, 2.0], theme.shadow);
                renderer.draw_rounded_rect(rect, 6.0 * self.zoom, theme.panel, Some((1.0, theme.border)));
                let title = Rect::from_min_size(rect.min, [rect.width(), ROW_HEIGHT * self.zoom]);
                label(renderer, &node.title, title.min[0] + PADDING, &title, theme.text_primary);
            }
        });
    }
}

// ========== Asset browser ==========

/// Grid of asset tiles with single selection
#[derive(Clone, Debug, PartialEq)]
pub struct AssetBrowserPanel {
    pub assets: Vec<String>,
    pub selected: Option<usize>,
    pub tile_size: f32,
}

impl Default for AssetBrowserPanel {
    fn default() -> Self {
        Self {
            assets: ["stone", "grass", "dirt", "water", "sand", "brick", "glass", "wood"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            selected: None,
            tile_size: 72.0,
        }
    }
}

impl AssetBrowserPanel {
    fn columns(&self, bounds: &Rect) -> usize {
        ((bounds.width() - PADDING) / (self.tile_size + PADDING)).floor().max(1.0) as usize
    }

    pub fn tile_rect(&self, index: usize, bounds: &Rect) -> Rect {
        let columns = self.columns(bounds);
        let (col, row) = (index % columns, index / columns);
        Rect::from_min_size(
            [
                bounds.min[0] + PADDING + col as f32 * (self.tile_size + PADDING),
                bounds.min[1] + PADDING + row as f32 * (self.tile_size + PADDING),
            ],
            [self.tile_size, self.tile_size],
        )
    }

    pub fn tile_at(&self, point: Point, bounds: &Rect) -> Option<usize> {
        (0..self.assets.len()).find(|&i| self.tile_rect(i, bounds).contains(point))
    }

    pub fn handle_event(&mut self, event: &InputEvent, bounds: &Rect) -> bool {
        if !event.is_press_of(MouseButton::Left) || !bounds.contains(event.position) {
            return false;
        }
        let hit = self.tile_at(event.position, bounds);
        let changed = hit != self.selected;
        self.selected = hit;
        changed || hit.is_some()
    }

    pub fn render(&self, renderer: &mut Renderer, theme: &Theme, bounds: &Rect) {
        for (index, name) in self.assets.iter().enumerate() {
            let tile = self.tile_rect(index, bounds);
            if !tile.intersects(bounds) {
                continue;
            }
            let border = if self.selected == Some(index) {
                (2.0, theme.accent)
            } else {
                (1.0, theme.border)
            };
            renderer.draw_rounded_rect(tile, 4.0, theme.panel, Some(border));
            let caption = Rect::from_min_size([tile.min[0], tile.max[1] - ROW_HEIGHT], [tile.width(), ROW_HEIGHT]);
            label(renderer, name, caption.min[0] + 4.0, &caption, theme.text_primary);
        }
    }
}

// ========== Console ==========

/// Scrollback of log lines, newest at the bottom
#[derive(Clone, Debug, PartialEq)]
pub struct ConsolePanel {
    pub lines: Vec<String>,
    /// Lines scrolled up from the bottom
    pub scroll: usize,
    pub max_lines: usize,
}

impl Default for ConsolePanel {
    fn default() -> Self {
        Self {
            lines: vec!["Canvas UI console ready".to_string()],
            scroll: 0,
            max_lines: 1000,
        }
    }
}

impl ConsolePanel {
    /// Append a line, dropping the oldest past `max_lines`
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
        if self.lines.len() > self.max_lines {
            let excess = self.lines.len() - self.max_lines;
            self.lines.drain(..excess);
        }
        self.scroll = self.scroll.min(self.lines.len().saturating_sub(1));
    }

    pub fn handle_event(&mut self, event: &InputEvent, bounds: &Rect) -> bool {
        if !matches!(event.kind, InputEventKind::MouseWheel | InputEventKind::TrackpadPan)
            || !bounds.contains(event.position)
        {
            return false;
        }
        let visible = (bounds.height() / ROW_HEIGHT).floor() as usize;
        let max = self.lines.len().saturating_sub(visible);
        let lines = wheel_lines(event).round() as isize;
        let scroll = (self.scroll as isize + lines).clamp(0, max as isize) as usize;
        let changed = scroll != self.scroll;
        self.scroll = scroll;
        changed
    }

    pub fn render(&self, renderer: &mut Renderer, theme: &Theme, bounds: &Rect) {
        let visible = (bounds.height() / ROW_HEIGHT).floor() as usize;
        let end = self.lines.len().saturating_sub(self.scroll);
        let start = end.saturating_sub(visible);
        for (row, line) in self.lines[start..end].iter().enumerate() {
            let rect = row_rect(bounds, row, 0.0);
            label(renderer, line, rect.min[0] + PADDING, &rect, theme.text_primary);
        }
    }
}

// ========== Preferences ==========

pub const PREFERENCE_PAGES: [&str; 5] = ["Interface", "Viewport", "Navigation", "Input", "System"];
const TAB_WIDTH: f32 = 110.0;

/// Page list on the left, page content on the right
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreferencesPanel {
    pub page: usize,
}

impl PreferencesPanel {
    pub fn page_name(&self) -> &'static str {
        PREFERENCE_PAGES[self.page.min(PREFERENCE_PAGES.len() - 1)]
    }

    pub fn handle_event(&mut self, event: &InputEvent, bounds: &Rect) -> bool {
        match event.kind {
            InputEventKind::MousePress if event.button == Some(MouseButton::Left) => {
                let tabs = Rect::from_min_size(bounds.min, [TAB_WIDTH, bounds.height()]);
                match row_at(&tabs, event.position, 0.0, PREFERENCE_PAGES.len()) {
                    Some(page) => {
                        self.page = page;
                        true
                    }
                    None => false,
                }
            }
            InputEventKind::KeyPress if event.key == Some(Key::Named(NamedKey::Tab)) => {
                let count = PREFERENCE_PAGES.len();
                self.page = if event.modifiers.shift {
                    (self.page + count - 1) % count
                } else {
                    (self.page + 1) % count
                };
                true
            }
            _ => false,
        }
    }

    pub fn render(&self, renderer: &mut Renderer, theme: &Theme, bounds: &Rect) {
        let tabs = Rect::from_min_size(bounds.min, [TAB_WIDTH.min(bounds.width()), bounds.height()]);
        renderer.draw_rect(tabs, theme.header);
        for (index, name) in PREFERENCE_PAGES.iter().enumerate() {
            let rect = row_rect(&tabs, index, 0.0);
            if index == self.page {
                renderer.draw_rect(rect, theme.accent.with_alpha(0.35));
            }
            label(renderer, name, rect.min[0] + PADDING, &rect, theme.text_primary);
        }
        let content = Rect::new([tabs.max[0], bounds.min[1]], bounds.max);
        let title = row_rect(&content, 0, 0.0);
        label(renderer, self.page_name(), title.min[0] + PADDING, &title, theme.text_primary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_ui::ScrollSource;

    fn bounds() -> Rect {
        Rect::new([0.0, 0.0], [300.0, 100.0])
    }

    #[test]
    fn test_properties_header_toggles_section() {
        let mut panel = PropertiesPanel::default();
        let before = panel.visible_rows().len();
        let press = InputEvent::mouse_press(Point::new(20.0, 5.0), MouseButton::Left);
        assert!(panel.handle_event(&press, &bounds()));
        assert!(!panel.sections[0].expanded);
        assert_eq!(panel.visible_rows().len(), before - 3);
    }

    #[test]
    fn test_properties_scroll_is_clamped() {
        let mut panel = PropertiesPanel::default();
        let down = InputEvent::wheel(Point::new(20.0, 20.0), Point::new(0.0, -100.0), ScrollSource::Wheel);
        assert!(panel.handle_event(&down, &bounds()));
        assert_eq!(panel.scroll, max_scroll(panel.visible_rows().len(), &bounds()));
        let up = InputEvent::wheel(Point::new(20.0, 20.0), Point::new(0.0, 100.0), ScrollSource::Wheel);
        panel.handle_event(&up, &bounds());
        assert_eq!(panel.scroll, 0.0);
    }

    #[test]
    fn test_outliner_click_and_arrows() {
        let mut panel = OutlinerPanel::default();
        let press = InputEvent::mouse_press(Point::new(20.0, ROW_HEIGHT * 2.5), MouseButton::Left);
        assert!(panel.handle_event(&press, &bounds()));
        assert_eq!(panel.selected, Some(2));

        let down = InputEvent::key_press(Point::zero(), Key::Named(NamedKey::ArrowDown));
        panel.handle_event(&down, &bounds());
        assert_eq!(panel.selected, Some(3));

        for _ in 0..10 {
            panel.handle_event(&down, &bounds());
        }
        assert_eq!(panel.selected, Some(panel.items.len() - 1));
    }

    #[test]
    fn test_outliner_click_below_items_is_ignored() {
        let mut panel = OutlinerPanel::default();
        let tall = Rect::new([0.0, 0.0], [300.0, 1000.0]);
        let press = InputEvent::mouse_press(Point::new(20.0, 900.0), MouseButton::Left);
        assert!(!panel.handle_event(&press, &tall));
        assert_eq!(panel.selected, None);
    }

    #[test]
    fn test_timeline_playback_wraps() {
        let mut timeline = TimelinePanel {
            start: 1,
            end: 10,
            ..TimelinePanel::default()
        };
        assert!(!timeline.update(1.0));
        let space = InputEvent::key_press(Point::zero(), Key::Named(NamedKey::Space));
        timeline.handle_event(&space, &bounds());
        assert!(timeline.playing);
        assert!(timeline.update(0.25));
        assert_eq!(timeline.current_frame(), 7);
        timeline.update(0.25);
        assert_eq!(timeline.current_frame(), 3);
    }

    #[test]
    fn test_timeline_scrub_clamps() {
        let mut timeline = TimelinePanel::default();
        let press = InputEvent::mouse_press(Point::new(300.0 - PADDING, 50.0), MouseButton::Left);
        timeline.handle_event(&press, &bounds());
        assert_eq!(timeline.current_frame(), timeline.end);
        let drag = InputEvent::mouse_move(Point::new(-500.0, 50.0), Point::zero());
        assert!(timeline.handle_event(&drag, &bounds()));
        assert_eq!(timeline.current_frame(), timeline.start);
    }

    #[test]
    fn test_material_zoom_keeps_cursor_point() {
        let mut panel = MaterialEditorPanel::default();
        let cursor = Point::new(120.0, 60.0);
        let node = panel.nodes[0].position;
        let before = panel.to_screen(node, &bounds());
        panel.handle_event(&InputEvent::wheel(cursor, Point::new(0.0, 1.0), ScrollSource::Wheel), &bounds());
        assert!(panel.zoom > 1.0);
        let after = panel.to_screen(node, &bounds());
        // Points move away from the cursor when zooming in
        assert!((after.x - cursor.x).abs() > (before.x - cursor.x).abs());
    }

    #[test]
    fn test_asset_selection() {
        let mut panel = AssetBrowserPanel::default();
        let wide = Rect::new([0.0, 0.0], [400.0, 400.0]);
        let center = panel.tile_rect(5, &wide).center();
        assert!(panel.handle_event(&InputEvent::mouse_press(center, MouseButton::Left), &wide));
        assert_eq!(panel.selected, Some(5));
    }

    #[test]
    fn test_console_caps_lines() {
        let mut console = ConsolePanel {
            max_lines: 3,
            ..ConsolePanel::default()
        };
        for i in 0..5 {
            console.push_line(format!("line {i}"));
        }
        assert_eq!(console.lines, vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_preferences_tab_cycles() {
        let mut prefs = PreferencesPanel::default();
        let tab = InputEvent::key_press(Point::zero(), Key::Named(NamedKey::Tab));
        prefs.handle_event(&tab, &bounds());
        assert_eq!(prefs.page_name(), "Viewport");
        let back = tab.clone().with_modifiers(canvas_ui::Modifiers {
            shift: true,
            ..canvas_ui::Modifiers::NONE
        });
        prefs.handle_event(&back, &bounds());
        prefs.handle_event(&back, &bounds());
        assert_eq!(prefs.page_name(), "System");
    }
}
