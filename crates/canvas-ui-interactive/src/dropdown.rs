//! Editor-type dropdown hosted in region headers
//!
//! A button showing the current selection that opens a vertical list of
//! choices below itself.

use canvas_ui::{
    Color, InputEvent, InputEventKind, Layer, MouseButton, NamedKey, Point, Rect, Renderer,
    TextStyle, Theme, WidgetRenderFlags,
};
use canvas_ui_macros::Settings;

use crate::Widget;

/// Visual styling for a dropdown
#[derive(Debug, Clone, Settings)]
pub struct DropdownStyle {
    #[settings(range(min = 12.0, max = 64.0))]
    pub item_height: f32,
    /// Minimum list width; the list is never narrower than the button
    pub list_width: f32,
    pub corner_radius: f32,
    pub font_size: f32,
    pub padding: f32,
    /// Swatch drawn left of each label (None = no swatches)
    pub swatch_size: Option<f32>,
}

impl Default for DropdownStyle {
    fn default() -> Self {
        Self {
            item_height: 22.0,
            list_width: 160.0,
            corner_radius: 4.0,
            font_size: 12.0,
            padding: 6.0,
            swatch_size: Some(8.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropdownState {
    Closed,
    Open,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DropdownItem {
    pub label: String,
    /// Accent shown in the item's swatch
    pub color: Option<Color>,
}

impl DropdownItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

/// Dropdown choosing a region's editor type
///
/// # Example
///
/// ```ignore
/// EditorTypeDropdown::new(vec![DropdownItem::new("3D Viewport"), DropdownItem::new("Outliner")])
///     .on_select(|index| log::info!("picked {index}"))
/// ```
pub struct EditorTypeDropdown {
    bounds: Rect,
    items: Vec<DropdownItem>,
    selected: usize,
    hovered: Option<usize>,
    state: DropdownState,
    /// Set when the opening press landed on the button so its release is not
    /// mistaken for a selection
    pressed_on_button: bool,
    style: DropdownStyle,
    on_select: Option<Box<dyn FnMut(usize)>>,
}

impl EditorTypeDropdown {
    pub fn new(items: Vec<DropdownItem>) -> Self {
        Self {
            bounds: Rect::ZERO,
            items,
            selected: 0,
            hovered: None,
            state: DropdownState::Closed,
            pressed_on_button: false,
            style: DropdownStyle::default(),
            on_select: None,
        }
    }

    pub fn with_style(mut self, style: DropdownStyle) -> Self {
        self.style = style.sanitized();
        self
    }

    pub fn with_selected(mut self, index: usize) -> Self {
        self.set_selected(index);
        self
    }

    /// Set a callback fired with the chosen index when a selection commits
    pub fn on_select(mut self, f: impl FnMut(usize) + 'static) -> Self {
        self.on_select = Some(Box::new(f));
        self
    }

    pub fn state(&self) -> DropdownState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == DropdownState::Open
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Change the selection without firing the callback; out-of-range is ignored
    pub fn set_selected(&mut self, index: usize) {
        if index < self.items.len() {
            self.selected = index;
        }
    }

    pub fn items(&self) -> &[DropdownItem] {
        &self.items
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn close(&mut self) {
        self.state = DropdownState::Closed;
        self.hovered = None;
        self.pressed_on_button = false;
    }

    /// Screen area of the open list
    pub fn list_rect(&self) -> Rect {
        let width = self.style.list_width.max(self.bounds.width());
        Rect::from_min_size(
            [self.bounds.min[0], self.bounds.max[1]],
            [width, self.style.item_height * self.items.len() as f32],
        )
    }

    /// Index of the list item under `point`, or `None` when closed or outside
    pub fn item_at(&self, point: Point) -> Option<usize> {
        if !self.is_open() {
            return None;
        }
        let list = self.list_rect();
        if !list.contains(point) {
            return None;
        }
        let index = ((point.y - list.min[1]) / self.style.item_height).floor() as usize;
        (index < self.items.len()).then_some(index)
    }

    fn commit(&mut self, index: usize) {
        self.selected = index;
        self.close();
        if let Some(ref mut on_select) = self.on_select {
            on_select(index);
        }
    }
}

impl Widget for EditorTypeDropdown {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    fn hit_area(&self) -> Rect {
        if self.is_open() {
            self.bounds.union(&self.list_rect())
        } else {
            self.bounds
        }
    }

    fn handle_event(&mut self, event: &InputEvent) -> bool {
        let on_button = self.bounds.contains(event.position);

        match (self.state, event.kind) {
            (DropdownState::Closed, InputEventKind::MousePress) => {
                on_button && event.button == Some(MouseButton::Left)
            }
            (DropdownState::Closed, InputEventKind::MouseRelease) => {
                if on_button && event.button == Some(MouseButton::Left) {
                    self.state = DropdownState::Open;
                    self.hovered = None;
                    return true;
                }
                false
            }
            (DropdownState::Open, InputEventKind::MouseMove) => {
                self.hovered = self.item_at(event.position);
                self.hovered.is_some() || on_button
            }
            (DropdownState::Open, InputEventKind::MousePress) => {
                if on_button {
                    self.pressed_on_button = true;
                } else if self.item_at(event.position).is_none() {
                    // Outside click dismisses; it is consumed so it does not
                    // reach whatever lies underneath the list.
                    self.close();
                }
                true
            }
            (DropdownState::Open, InputEventKind::MouseRelease) => {
                if let Some(index) = self.item_at(event.position) {
                    self.commit(index);
                } else if on_button && self.pressed_on_button {
                    self.close();
                }
                true
            }
            (DropdownState::Open, InputEventKind::KeyPress) => {
                if event.is_named_key_press(NamedKey::Escape) {
                    self.close();
                    return true;
                }
                if event.is_named_key_press(NamedKey::Enter) {
                    if let Some(index) = self.hovered {
                        self.commit(index);
                    }
                    return true;
                }
                false
            }
            _ => false,
        }
    }

    fn render(&mut self, renderer: &mut Renderer, theme: &Theme) {
        let style = self.style.clone();
        let text_style = TextStyle::sized(style.font_size);

        renderer.draw_rounded_rect(
            self.bounds,
            style.corner_radius,
            if self.is_open() { theme.hover_background } else { theme.panel },
            Some((1.0, theme.border)),
        );

        let label_y = self.bounds.center().y - style.font_size * 0.6;
        let mut x = self.bounds.min[0] + style.padding;
        if let Some(item) = self.items.get(self.selected) {
            if let (Some(size), Some(color)) = (style.swatch_size, item.color) {
                renderer.draw_circle(
                    Point::new(x + size * 0.5, self.bounds.center().y),
                    size * 0.5,
                    color,
                );
                x += size + style.padding;
            }
            renderer.draw_text(&item.label, Point::new(x, label_y), &text_style, theme.text_primary);
        }

        // Disclosure chevron
        let cx = self.bounds.max[0] - style.padding - 4.0;
        let cy = self.bounds.center().y;
        let dir = if self.is_open() { -1.0 } else { 1.0 };
        renderer.draw_line_batched(
            Point::new(cx - 4.0, cy - 2.0 * dir),
            Point::new(cx, cy + 2.0 * dir),
            1.5,
            theme.text_secondary,
        );
        renderer.draw_line_batched(
            Point::new(cx, cy + 2.0 * dir),
            Point::new(cx + 4.0, cy - 2.0 * dir),
            1.5,
            theme.text_secondary,
        );

        if !self.is_open() {
            return;
        }

        let list = self.list_rect();
        renderer.with_layer(Layer::Overlay, |renderer| {
            renderer.draw_shadow(list, 6.0, 0.0, [0.0, 3.0], theme.shadow);
            renderer.draw_rounded_rect(list, style.corner_radius, theme.panel, Some((1.0, theme.border)));

            for (index, item) in self.items.iter().enumerate() {
                let row = Rect::from_min_size(
                    [list.min[0], list.min[1] + index as f32 * style.item_height],
                    [list.width(), style.item_height],
                );
                if self.hovered == Some(index) {
                    renderer.draw_rect(row.shrink(1.0), theme.hover_background);
                }
                let mut x = row.min[0] + style.padding;
                if let (Some(size), Some(color)) = (style.swatch_size, item.color) {
                    renderer.draw_circle(Point::new(x + size * 0.5, row.center().y), size * 0.5, color);
                    x += size + style.padding;
                }
                let color = if index == self.selected {
                    theme.accent
                } else {
                    theme.text_primary
                };
                renderer.draw_text(
                    &item.label,
                    Point::new(x, row.center().y - style.font_size * 0.6),
                    &text_style,
                    color,
                );
            }
        });
    }

    fn render_flags(&self) -> WidgetRenderFlags {
        if self.is_open() {
            WidgetRenderFlags::HAS_SHADOW | WidgetRenderFlags::FORCE_RENDER
        } else {
            WidgetRenderFlags::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn dropdown() -> (EditorTypeDropdown, Rc<Cell<Option<usize>>>) {
        let picked = Rc::new(Cell::new(None));
        let sink = picked.clone();
        let mut dd = EditorTypeDropdown::new(vec![
            DropdownItem::new("3D Viewport"),
            DropdownItem::new("Properties"),
            DropdownItem::new("Outliner"),
        ])
        .on_select(move |i| sink.set(Some(i)));
        dd.set_bounds(Rect::new([0.0, 0.0], [120.0, 24.0]));
        (dd, picked)
    }

    fn click(dd: &mut EditorTypeDropdown, p: Point) {
        dd.handle_event(&InputEvent::mouse_press(p, MouseButton::Left));
        dd.handle_event(&InputEvent::mouse_release(p, MouseButton::Left));
    }

    #[test]
    fn test_opens_on_release() {
        let (mut dd, _) = dropdown();
        let p = Point::new(10.0, 10.0);
        assert!(dd.handle_event(&InputEvent::mouse_press(p, MouseButton::Left)));
        assert_eq!(dd.state(), DropdownState::Closed);
        assert!(dd.handle_event(&InputEvent::mouse_release(p, MouseButton::Left)));
        assert_eq!(dd.state(), DropdownState::Open);
    }

    #[test]
    fn test_selection_fires_callback_and_closes() {
        let (mut dd, picked) = dropdown();
        click(&mut dd, Point::new(10.0, 10.0));
        // Second row: y in [46, 68)
        click(&mut dd, Point::new(10.0, 50.0));
        assert_eq!(picked.get(), Some(1));
        assert_eq!(dd.selected(), 1);
        assert_eq!(dd.state(), DropdownState::Closed);
    }

    #[test]
    fn test_outside_press_closes_without_selection() {
        let (mut dd, picked) = dropdown();
        click(&mut dd, Point::new(10.0, 10.0));
        assert!(dd.handle_event(&InputEvent::mouse_press(Point::new(500.0, 500.0), MouseButton::Left)));
        assert_eq!(dd.state(), DropdownState::Closed);
        assert_eq!(picked.get(), None);
    }

    #[test]
    fn test_button_click_toggles_closed() {
        let (mut dd, picked) = dropdown();
        click(&mut dd, Point::new(10.0, 10.0));
        click(&mut dd, Point::new(10.0, 10.0));
        assert_eq!(dd.state(), DropdownState::Closed);
        assert_eq!(picked.get(), None);
    }

    #[test]
    fn test_item_at_outside_list_is_none() {
        let (mut dd, _) = dropdown();
        assert_eq!(dd.item_at(Point::new(10.0, 30.0)), None);
        click(&mut dd, Point::new(10.0, 10.0));
        assert_eq!(dd.item_at(Point::new(10.0, 30.0)), Some(0));
        assert_eq!(dd.item_at(Point::new(10.0, 500.0)), None);
        assert_eq!(dd.item_at(Point::new(-5.0, 30.0)), None);
    }

    #[test]
    fn test_escape_closes() {
        let (mut dd, _) = dropdown();
        click(&mut dd, Point::new(10.0, 10.0));
        let esc = InputEvent::key_press(Point::zero(), canvas_ui::Key::Named(NamedKey::Escape));
        assert!(dd.handle_event(&esc));
        assert!(!dd.is_open());
    }
}
