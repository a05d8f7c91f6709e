//! Editors hosted by leaf regions.
//!
//! The set of editor kinds is closed, so an editor is a tagged variant
//! dispatched by `match` rather than a trait object.

use canvas_ui::{Color, InputEvent, Point, Rect, Renderer, TextStyle, Theme};
use canvas_ui_interactive::DropdownItem;

use crate::panels::{
    AssetBrowserPanel, ConsolePanel, MaterialEditorPanel, OutlinerPanel, PreferencesPanel,
    PropertiesPanel, TimelinePanel,
};
use crate::viewport::Viewport3DEditor;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EditorKind {
    Viewport3D,
    Properties,
    Outliner,
    Timeline,
    MaterialEditor,
    AssetBrowser,
    Console,
    Preferences,
    Placeholder,
}

impl EditorKind {
    pub const ALL: [EditorKind; 9] = [
        EditorKind::Viewport3D,
        EditorKind::Properties,
        EditorKind::Outliner,
        EditorKind::Timeline,
        EditorKind::MaterialEditor,
        EditorKind::AssetBrowser,
        EditorKind::Console,
        EditorKind::Preferences,
        EditorKind::Placeholder,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EditorKind::Viewport3D => "3D Viewport",
            EditorKind::Properties => "Properties",
            EditorKind::Outliner => "Outliner",
            EditorKind::Timeline => "Timeline",
            EditorKind::MaterialEditor => "Material Editor",
            EditorKind::AssetBrowser => "Asset Browser",
            EditorKind::Console => "Console",
            EditorKind::Preferences => "Preferences",
            EditorKind::Placeholder => "Empty",
        }
    }

    pub fn index(&self) -> usize {
        EditorKind::ALL
            .iter()
            .position(|k| k == self)
            .unwrap_or(EditorKind::ALL.len() - 1)
    }

    pub fn from_index(index: usize) -> Option<EditorKind> {
        EditorKind::ALL.get(index).copied()
    }

    /// Accent shown next to the kind in the header dropdown
    pub fn accent(&self, theme: &Theme) -> Color {
        match self {
            EditorKind::Viewport3D => theme.axis_z,
            EditorKind::Properties | EditorKind::Preferences => theme.accent,
            EditorKind::Outliner | EditorKind::AssetBrowser => theme.axis_y,
            EditorKind::Timeline | EditorKind::Console => theme.axis_x,
            EditorKind::MaterialEditor => theme.splitter_active,
            EditorKind::Placeholder => theme.text_secondary,
        }
    }

    /// Dropdown entries for every kind, in [`EditorKind::ALL`] order
    pub fn dropdown_items(theme: &Theme) -> Vec<DropdownItem> {
        EditorKind::ALL
            .iter()
            .map(|kind| DropdownItem::new(kind.label()).with_color(kind.accent(theme)))
            .collect()
    }
}

/// Identity of an editor instance, stable across splits and joins
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditorId(pub u64);

/// Per-kind editor state
pub enum EditorSpace {
    Viewport3D(Box<Viewport3DEditor>),
    Properties(PropertiesPanel),
    Outliner(OutlinerPanel),
    Timeline(TimelinePanel),
    MaterialEditor(MaterialEditorPanel),
    AssetBrowser(AssetBrowserPanel),
    Console(ConsolePanel),
    Preferences(PreferencesPanel),
    Placeholder,
}

impl EditorSpace {
    pub fn new(kind: EditorKind) -> Self {
        match kind {
            EditorKind::Viewport3D => EditorSpace::Viewport3D(Box::default()),
            EditorKind::Properties => EditorSpace::Properties(PropertiesPanel::default()),
            EditorKind::Outliner => EditorSpace::Outliner(OutlinerPanel::default()),
            EditorKind::Timeline => EditorSpace::Timeline(TimelinePanel::default()),
            EditorKind::MaterialEditor => EditorSpace::MaterialEditor(MaterialEditorPanel::default()),
            EditorKind::AssetBrowser => EditorSpace::AssetBrowser(AssetBrowserPanel::default()),
            EditorKind::Console => EditorSpace::Console(ConsolePanel::default()),
            EditorKind::Preferences => EditorSpace::Preferences(PreferencesPanel::default()),
            EditorKind::Placeholder => EditorSpace::Placeholder,
        }
    }

    pub fn kind(&self) -> EditorKind {
        match self {
            EditorSpace::Viewport3D(_) => EditorKind::Viewport3D,
            EditorSpace::Properties(_) => EditorKind::Properties,
            EditorSpace::Outliner(_) => EditorKind::Outliner,
            EditorSpace::Timeline(_) => EditorKind::Timeline,
            EditorSpace::MaterialEditor(_) => EditorKind::MaterialEditor,
            EditorSpace::AssetBrowser(_) => EditorKind::AssetBrowser,
            EditorSpace::Console(_) => EditorKind::Console,
            EditorSpace::Preferences(_) => EditorKind::Preferences,
            EditorSpace::Placeholder => EditorKind::Placeholder,
        }
    }
}

/// Content of a leaf region. Owns no layout; bounds are passed on every call.
pub struct Editor {
    id: EditorId,
    pub space: EditorSpace,
    events_received: u64,
}

impl Editor {
    pub fn new(id: EditorId, kind: EditorKind) -> Self {
        Self {
            id,
            space: EditorSpace::new(kind),
            events_received: 0,
        }
    }

    pub fn id(&self) -> EditorId {
        self.id
    }

    pub fn kind(&self) -> EditorKind {
        self.space.kind()
    }

    /// Events routed to this editor, handled or not
    pub fn events_received(&self) -> u64 {
        self.events_received
    }

    pub fn viewport(&self) -> Option<&Viewport3DEditor> {
        match &self.space {
            EditorSpace::Viewport3D(viewport) => Some(viewport),
            _ => None,
        }
    }

    pub fn viewport_mut(&mut self) -> Option<&mut Viewport3DEditor> {
        match &mut self.space {
            EditorSpace::Viewport3D(viewport) => Some(viewport),
            _ => None,
        }
    }

    pub fn render(&mut self, renderer: &mut Renderer, theme: &Theme, bounds: &Rect) {
        if !matches!(self.space, EditorSpace::Viewport3D(_)) {
            renderer.draw_rect(*bounds, theme.panel);
        }
        renderer.with_clip(*bounds, |renderer| match &mut self.space {
            EditorSpace::Viewport3D(viewport) => viewport.render(renderer, theme, bounds),
            EditorSpace::Properties(panel) => panel.render(renderer, theme, bounds),
            EditorSpace::Outliner(panel) => panel.render(renderer, theme, bounds),
            EditorSpace::Timeline(panel) => panel.render(renderer, theme, bounds),
            EditorSpace::MaterialEditor(panel) => panel.render(renderer, theme, bounds),
            EditorSpace::AssetBrowser(panel) => panel.render(renderer, theme, bounds),
            EditorSpace::Console(panel) => panel.render(renderer, theme, bounds),
            EditorSpace::Preferences(panel) => panel.render(renderer, theme, bounds),
            EditorSpace::Placeholder => {
                let text = EditorKind::Placeholder.label();
                let style = TextStyle::sized(14.0);
                if let Some([w, h]) = renderer.measure_text(text, &style) {
                    let c = bounds.center();
                    renderer.draw_text(
                        text,
                        Point::new(c.x - w * 0.5, c.y - h * 0.5),
                        &style,
                        theme.text_secondary,
                    );
                }
            }
        });
    }

    /// Drawn after the region's widgets
    pub fn render_overlay(&mut self, renderer: &mut Renderer, theme: &Theme, bounds: &Rect) {
        if let EditorSpace::Viewport3D(viewport) = &mut self.space {
            viewport.render_overlay(renderer, theme, bounds);
        }
    }

    pub fn handle_event(&mut self, event: &InputEvent, bounds: &Rect) -> bool {
        self.events_received += 1;
        match &mut self.space {
            EditorSpace::Viewport3D(viewport) => viewport.handle_event(event, bounds),
            EditorSpace::Properties(panel) => panel.handle_event(event, bounds),
            EditorSpace::Outliner(panel) => panel.handle_event(event, bounds),
            EditorSpace::Timeline(panel) => panel.handle_event(event, bounds),
            EditorSpace::MaterialEditor(panel) => panel.handle_event(event, bounds),
            EditorSpace::AssetBrowser(panel) => panel.handle_event(event, bounds),
            EditorSpace::Console(panel) => panel.handle_event(event, bounds),
            EditorSpace::Preferences(panel) => panel.handle_event(event, bounds),
            EditorSpace::Placeholder => false,
        }
    }

    /// Advance animations; returns true when the content changed
    pub fn update(&mut self, dt: f32) -> bool {
        match &mut self.space {
            EditorSpace::Viewport3D(viewport) => viewport.update(dt),
            EditorSpace::Timeline(panel) => panel.update(dt),
            _ => false,
        }
    }

    /// Whether the editor wants to be redrawn every frame
    pub fn is_animating(&self) -> bool {
        match &self.space {
            EditorSpace::Viewport3D(viewport) => viewport.is_animating(),
            EditorSpace::Timeline(panel) => panel.playing,
            _ => false,
        }
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("events_received", &self.events_received)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_ui::{HeadlessBackend, Key, NamedKey, RendererConfig};

    #[test]
    fn test_kind_index_round_trip() {
        for kind in EditorKind::ALL {
            assert_eq!(EditorKind::from_index(kind.index()), Some(kind));
        }
        assert_eq!(EditorKind::from_index(EditorKind::ALL.len()), None);
    }

    #[test]
    fn test_space_matches_kind() {
        for kind in EditorKind::ALL {
            assert_eq!(Editor::new(EditorId(1), kind).kind(), kind);
        }
    }

    #[test]
    fn test_timeline_animates_while_playing() {
        let bounds = Rect::new([0.0, 0.0], [300.0, 100.0]);
        let mut editor = Editor::new(EditorId(7), EditorKind::Timeline);
        assert!(!editor.is_animating());
        let space = InputEvent::key_press(Point::zero(), Key::Named(NamedKey::Space));
        assert!(editor.handle_event(&space, &bounds));
        assert!(editor.is_animating());
        assert!(editor.update(0.1));
        assert_eq!(editor.events_received(), 1);
    }

    #[test]
    fn test_every_kind_renders_balanced() {
        let mut renderer = Renderer::new(Box::new(HeadlessBackend::new()), RendererConfig::default());
        let bounds = Rect::new([0.0, 0.0], [400.0, 300.0]);
        renderer.begin_frame([400, 300]);
        for kind in EditorKind::ALL {
            let mut editor = Editor::new(EditorId(0), kind);
            editor.render(&mut renderer, &Theme::dark(), &bounds);
            editor.render_overlay(&mut renderer, &Theme::dark(), &bounds);
        }
        renderer.end_frame();
        assert!(renderer.current_clip().is_none());
    }
}
