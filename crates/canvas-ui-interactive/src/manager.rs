use canvas_ui::{InputEvent, Renderer, Theme};
use slotmap::{new_key_type, SlotMap};

use crate::Widget;

new_key_type! {
    /// Handle to a widget owned by a [`WidgetManager`]
    pub struct WidgetId;
}

/// Ordered widget collection with an optional modal widget.
///
/// Event routing: a visible modal gets every event. Otherwise widgets are
/// tried topmost first (reverse insertion order) until one consumes the
/// event. Rendering runs in insertion order with the modal drawn last.
#[derive(Default)]
pub struct WidgetManager {
    widgets: SlotMap<WidgetId, Box<dyn Widget>>,
    order: Vec<WidgetId>,
    modal: Option<WidgetId>,
}

impl WidgetManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, widget: Box<dyn Widget>) -> WidgetId {
        let id = self.widgets.insert(widget);
        self.order.push(id);
        id
    }

    /// Install a modal widget, replacing (and returning) any previous one
    pub fn set_modal(&mut self, widget: Box<dyn Widget>) -> (WidgetId, Option<Box<dyn Widget>>) {
        let previous = self.clear_modal();
        let id = self.widgets.insert(widget);
        self.modal = Some(id);
        log::debug!("modal widget {id:?} installed");
        (id, previous)
    }

    pub fn clear_modal(&mut self) -> Option<Box<dyn Widget>> {
        self.modal.take().and_then(|id| self.widgets.remove(id))
    }

    pub fn remove(&mut self, id: WidgetId) -> Option<Box<dyn Widget>> {
        if self.modal == Some(id) {
            return self.clear_modal();
        }
        self.order.retain(|w| *w != id);
        self.widgets.remove(id)
    }

    pub fn get(&self, id: WidgetId) -> Option<&dyn Widget> {
        self.widgets.get(id).map(|w| w.as_ref())
    }

    pub fn get_mut(&mut self, id: WidgetId) -> Option<&mut (dyn Widget + 'static)> {
        self.widgets.get_mut(id).map(|w| w.as_mut())
    }

    pub fn modal(&self) -> Option<WidgetId> {
        self.modal
    }

    /// Whether a modal is installed and currently taking events
    pub fn has_visible_modal(&self) -> bool {
        self.visible_modal().is_some()
    }

    fn visible_modal(&self) -> Option<WidgetId> {
        self.modal
            .filter(|id| self.widgets.get(*id).is_some_and(|w| w.is_visible()))
    }

    /// Non-modal widgets in insertion order
    pub fn ids(&self) -> &[WidgetId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn handle_event(&mut self, event: &InputEvent) -> bool {
        if let Some(modal) = self.visible_modal() {
            if let Some(widget) = self.widgets.get_mut(modal) {
                widget.handle_event(event);
            }
            return true;
        }

        for id in self.order.iter().rev() {
            let Some(widget) = self.widgets.get_mut(*id) else {
                continue;
            };
            if widget.is_visible() && widget.handle_event(event) {
                return true;
            }
        }
        false
    }

    pub fn update(&mut self, dt: f32) {
        for (_, widget) in self.widgets.iter_mut() {
            widget.update(dt);
        }
    }

    /// Render visible widgets, skipping those hidden behind opaque widgets
    /// stacked above them.
    pub fn render(&mut self, renderer: &mut Renderer, theme: &Theme) {
        // Walk topmost first so each widget is tested only against widgets
        // drawn after it.
        let mut culled = Vec::new();
        let modal = self.visible_modal();
        if let Some(widget) = modal.and_then(|id| self.widgets.get(id)) {
            if widget.is_opaque() && widget.render_flags().can_occlude() {
                renderer.occlusion_mut().add_occluder(widget.bounds());
            }
        }
        for id in self.order.iter().rev() {
            let Some(widget) = self.widgets.get(*id) else {
                continue;
            };
            if !widget.is_visible() {
                continue;
            }
            let bounds = widget.bounds();
            if renderer
                .occlusion_mut()
                .should_cull_widget(&bounds, widget.render_flags())
            {
                culled.push(*id);
                continue;
            }
            if widget.is_opaque() && widget.render_flags().can_occlude() {
                renderer.occlusion_mut().add_occluder(bounds);
            }
        }

        if !culled.is_empty() {
            log::trace!("{} widgets occluded", culled.len());
        }
        for id in &self.order {
            if culled.contains(id) {
                continue;
            }
            if let Some(widget) = self.widgets.get_mut(*id) {
                if widget.is_visible() {
                    widget.render(renderer, theme);
                }
            }
        }

        if let Some(widget) = modal.and_then(|id| self.widgets.get_mut(id)) {
            widget.render(renderer, theme);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_ui::{
        Color, HeadlessBackend, MouseButton, Point, Rect, RendererConfig, WidgetRenderFlags,
    };
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records calls into a shared log
    struct Recorder {
        name: &'static str,
        bounds: Rect,
        consume: bool,
        opaque: bool,
        flags: WidgetRenderFlags,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Recorder {
        fn new(name: &'static str, bounds: Rect, log: &Rc<RefCell<Vec<String>>>) -> Self {
            Self {
                name,
                bounds,
                consume: false,
                opaque: false,
                flags: WidgetRenderFlags::empty(),
                log: log.clone(),
            }
        }
    }

    impl Widget for Recorder {
        fn bounds(&self) -> Rect {
            self.bounds
        }

        fn set_bounds(&mut self, bounds: Rect) {
            self.bounds = bounds;
        }

        fn handle_event(&mut self, _event: &InputEvent) -> bool {
            self.log.borrow_mut().push(format!("event:{}", self.name));
            self.consume
        }

        fn render(&mut self, renderer: &mut Renderer, _theme: &Theme) {
            self.log.borrow_mut().push(format!("render:{}", self.name));
            renderer.draw_rect(self.bounds, Color::WHITE);
        }

        fn render_flags(&self) -> WidgetRenderFlags {
            self.flags
        }

        fn is_opaque(&self) -> bool {
            self.opaque
        }
    }

    fn press() -> InputEvent {
        InputEvent::mouse_press(Point::new(5.0, 5.0), MouseButton::Left)
    }

    fn renderer() -> Renderer {
        Renderer::new(Box::new(HeadlessBackend::new()), RendererConfig::default())
    }

    #[test]
    fn test_events_go_topmost_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut manager = WidgetManager::new();
        let bounds = Rect::new([0.0, 0.0], [10.0, 10.0]);
        manager.add(Box::new(Recorder::new("a", bounds, &log)));
        let mut b = Recorder::new("b", bounds, &log);
        b.consume = true;
        manager.add(Box::new(b));
        manager.add(Box::new(Recorder::new("c", bounds, &log)));

        assert!(manager.handle_event(&press()));
        assert_eq!(*log.borrow(), vec!["event:c", "event:b"]);
    }

    #[test]
    fn test_modal_receives_everything_and_renders_last() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut manager = WidgetManager::new();
        let bounds = Rect::new([0.0, 0.0], [10.0, 10.0]);
        let mut a = Recorder::new("a", bounds, &log);
        a.consume = true;
        manager.add(Box::new(a));
        manager.set_modal(Box::new(Recorder::new("modal", bounds, &log)));
        manager.add(Box::new(Recorder::new("b", bounds, &log)));

        assert!(manager.handle_event(&press()));
        assert_eq!(*log.borrow(), vec!["event:modal"]);

        log.borrow_mut().clear();
        let mut r = renderer();
        r.begin_frame([100, 100]);
        manager.render(&mut r, &Theme::dark());
        r.end_frame();
        assert_eq!(*log.borrow(), vec!["render:a", "render:b", "render:modal"]);
    }

    #[test]
    fn test_opaque_widget_culls_covered_widget() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut manager = WidgetManager::new();
        manager.add(Box::new(Recorder::new(
            "under",
            Rect::new([10.0, 10.0], [20.0, 20.0]),
            &log,
        )));
        let mut cover = Recorder::new("cover", Rect::new([0.0, 0.0], [50.0, 50.0]), &log);
        cover.opaque = true;
        manager.add(Box::new(cover));
        let mut forced = Recorder::new("forced", Rect::new([10.0, 10.0], [20.0, 20.0]), &log);
        forced.flags = WidgetRenderFlags::FORCE_RENDER;
        let forced_id = manager.add(Box::new(forced));

        let mut r = renderer();
        r.begin_frame([100, 100]);
        manager.render(&mut r, &Theme::dark());
        let stats = r.end_frame();
        assert_eq!(*log.borrow(), vec!["render:cover", "render:forced"]);
        assert_eq!(stats.culled_widgets, 1);

        // Removing the cover brings the widget back
        log.borrow_mut().clear();
        let cover_id = manager.ids()[1];
        manager.remove(cover_id);
        assert!(manager.get(forced_id).is_some());
        r.begin_frame([100, 100]);
        manager.render(&mut r, &Theme::dark());
        r.end_frame();
        assert_eq!(*log.borrow(), vec!["render:under", "render:forced"]);
    }
}
