use canvas_ui::{InputEvent, Rect, Renderer, Theme, WidgetRenderFlags};

/// A small interactive control hosted by a [`crate::WidgetManager`].
///
/// Widgets own their bounds and render themselves directly into the
/// [`Renderer`]; layout is the host's job.
pub trait Widget {
    fn bounds(&self) -> Rect;

    fn set_bounds(&mut self, bounds: Rect);

    fn is_visible(&self) -> bool {
        true
    }

    /// Returns true if the event was consumed
    fn handle_event(&mut self, event: &InputEvent) -> bool;

    fn render(&mut self, renderer: &mut Renderer, theme: &Theme);

    /// Culling properties; the default allows culling
    fn render_flags(&self) -> WidgetRenderFlags {
        WidgetRenderFlags::empty()
    }

    /// Whether the widget fully covers its bounds with opaque pixels
    fn is_opaque(&self) -> bool {
        false
    }

    /// Area that receives pointer events; may extend past `bounds` (open popups)
    fn hit_area(&self) -> Rect {
        self.bounds()
    }

    /// Advance animations by `dt` seconds
    fn update(&mut self, _dt: f32) {}
}
