use canvas_ui::{Color, HeadlessBackend, InputEvent, Key, MouseButton, NamedKey, Point, Rect};
use canvas_ui_editor::{Canvas, CanvasConfig, EditorKind};
use canvas_ui_interactive::SplitDirection;

fn canvas(size: [u32; 2]) -> Canvas {
    let _ = env_logger::builder().is_test(true).try_init();
    Canvas::new(Box::new(HeadlessBackend::new()), CanvasConfig::default(), size)
}

#[test]
fn press_in_first_child_reaches_only_its_viewport() {
    let mut canvas = canvas([400, 300]);
    let root = canvas.create_region(Rect::new([0.0, 0.0], [400.0, 300.0]), EditorKind::Properties);
    let (first, second) = canvas
        .tree_mut()
        .split(root, SplitDirection::Horizontal, 0.5)
        .unwrap();

    let a = canvas.get_region(first).unwrap().bounds();
    let b = canvas.get_region(second).unwrap().bounds();
    assert_eq!(a.width(), 400.0);
    assert_eq!(b.width(), 400.0);
    assert!((a.height() - 149.0).abs() < 1.0);
    assert!((b.height() - 149.0).abs() < 1.0);

    assert!(canvas.tree_mut().set_editor_kind(first, EditorKind::Viewport3D));
    let content = canvas.tree().content_bounds(first).unwrap();
    let target = Point::new(content.min[0] + 60.0, content.center().y);
    assert!(content.contains(target));

    canvas.handle_event(&InputEvent::mouse_press(target, MouseButton::Left));

    let viewport = canvas.tree().editor(first).unwrap();
    assert_eq!(viewport.kind(), EditorKind::Viewport3D);
    assert_eq!(viewport.events_received(), 1);
    assert_eq!(canvas.tree().editor(second).unwrap().events_received(), 0);
}

#[test]
fn middle_drag_in_viewport_marks_it_for_redraw() {
    let mut canvas = canvas([800, 600]);
    let root = canvas.create_region(Rect::new([0.0, 0.0], [800.0, 600.0]), EditorKind::Viewport3D);
    let (viewport, properties) = canvas
        .tree_mut()
        .split(root, SplitDirection::Vertical, 0.6)
        .unwrap();

    canvas.begin_frame();
    assert_eq!(canvas.render(), 3);
    canvas.end_frame();
    canvas.present_frame();
    assert!(!canvas.needs_redraw());

    let start = Point::new(100.0, 400.0);
    let before = canvas.tree().editor(viewport).unwrap().viewport().unwrap().camera.rotation;
    assert!(canvas.handle_event(&InputEvent::mouse_press(start, MouseButton::Middle)));
    assert!(canvas.handle_event(&InputEvent::mouse_move(
        Point::new(160.0, 400.0),
        Point::new(60.0, 0.0)
    )));
    let after = canvas.tree().editor(viewport).unwrap().viewport().unwrap().camera.rotation;
    assert!(!before.abs_diff_eq(after, 1e-6));

    assert!(canvas.needs_redraw());
    canvas.begin_frame();
    // Viewport leaf and its parent; the properties leaf stays clean
    assert_eq!(canvas.render(), 2);
    canvas.end_frame();
    assert!(!canvas.get_region(properties).unwrap().needs_update());
}

#[test]
fn twelve_thousand_and_one_rects_make_two_batches() {
    let mut canvas = canvas([1024, 768]);
    canvas.begin_frame();
    let renderer = canvas.renderer_mut();
    for i in 0..12_001 {
        let x = (i % 100) as f32 * 10.0;
        let y = (i / 100) as f32 * 6.0;
        renderer.draw_rect(Rect::from_min_size([x, y], [8.0, 4.0]), Color::WHITE);
    }
    let stats = canvas.end_frame();
    assert_eq!(stats.batches, 2);

    let sizes: Vec<usize> = canvas
        .renderer()
        .flushed_batches()
        .iter()
        .map(|batch| batch.vertex_count())
        .collect();
    assert_eq!(sizes, vec![10_000, 2_001]);
}

/// Centre of entry `index` in a region menu opened at `at`
fn menu_entry(at: Point, index: usize) -> Point {
    // Three layout items, an 8px separator, then the editor kinds
    let top = if index < 3 {
        index as f32 * 22.0
    } else {
        3.0 * 22.0 + 8.0 + (index - 4) as f32 * 22.0
    };
    Point::new(at.x + 40.0, at.y + top + 11.0)
}

#[test]
fn right_click_menu_is_modal_and_splits_the_region() {
    let mut canvas = canvas([800, 600]);
    let root = canvas.create_region(Rect::new([0.0, 0.0], [800.0, 600.0]), EditorKind::Outliner);
    let at = Point::new(100.0, 100.0);

    assert!(canvas.handle_event(&InputEvent::mouse_press(at, MouseButton::Right)));
    assert_eq!(canvas.tree().open_menu(), Some(root));
    assert!(canvas.get_region(root).unwrap().widgets.modal().is_some());

    // Everything goes to the menu while it is open
    let item = menu_entry(at, 1);
    let before = canvas.tree().editor(root).unwrap().events_received();
    assert!(canvas.handle_event(&InputEvent::mouse_move(item, Point::new(0.0, 0.0))));
    assert!(canvas.handle_event(&InputEvent::mouse_press(item, MouseButton::Left)));
    assert_eq!(canvas.tree().editor(root).unwrap().events_received(), before);

    // Releasing over "Split Vertical" applies it
    assert!(canvas.handle_event(&InputEvent::mouse_release(item, MouseButton::Left)));
    assert_eq!(canvas.tree().open_menu(), None);
    let region = canvas.get_region(root).unwrap();
    assert!(!region.is_leaf());
    let [first, second] = region.children().unwrap();
    assert_eq!(canvas.tree().editor(first).unwrap().kind(), EditorKind::Outliner);
    let a = canvas.get_region(first).unwrap().bounds();
    let b = canvas.get_region(second).unwrap().bounds();
    assert!(a.max[0] < b.min[0]);
    assert!(canvas.get_region(first).unwrap().widgets.is_empty());
}

#[test]
fn region_menu_switches_editor_and_joins() {
    let mut canvas = canvas([800, 600]);
    let root = canvas.create_region(Rect::new([0.0, 0.0], [800.0, 600.0]), EditorKind::Viewport3D);
    let (first, second) = canvas
        .tree_mut()
        .split(root, SplitDirection::Vertical, 0.5)
        .unwrap();

    let at = Point::new(500.0, 100.0);
    canvas.handle_event(&InputEvent::mouse_press(at, MouseButton::Right));
    assert_eq!(canvas.tree().open_menu(), Some(second));
    let console = menu_entry(at, 4 + EditorKind::Console.index());
    canvas.handle_event(&InputEvent::mouse_release(console, MouseButton::Left));
    assert_eq!(canvas.tree().editor(second).unwrap().kind(), EditorKind::Console);

    // Escape closes without an action
    canvas.handle_event(&InputEvent::mouse_press(at, MouseButton::Right));
    canvas.handle_event(&InputEvent::key_press(at, Key::Named(NamedKey::Escape)));
    assert_eq!(canvas.tree().open_menu(), None);
    assert!(!canvas.get_region(root).unwrap().is_leaf());

    let at = Point::new(100.0, 100.0);
    canvas.handle_event(&InputEvent::mouse_press(at, MouseButton::Right));
    assert_eq!(canvas.tree().open_menu(), Some(first));
    canvas.handle_event(&InputEvent::mouse_release(menu_entry(at, 2), MouseButton::Left));
    assert!(canvas.get_region(root).unwrap().is_leaf());
    assert_eq!(canvas.tree().editor(root).unwrap().kind(), EditorKind::Viewport3D);
}

#[test]
fn open_menu_is_drawn_and_marked_dirty() {
    let mut canvas = canvas([800, 600]);
    let root = canvas.create_region(Rect::new([0.0, 0.0], [800.0, 600.0]), EditorKind::Properties);
    canvas.begin_frame();
    canvas.render();
    canvas.end_frame();
    canvas.present_frame();

    canvas.handle_event(&InputEvent::mouse_press(Point::new(300.0, 200.0), MouseButton::Right));
    assert!(canvas.get_region(root).unwrap().needs_update());
    canvas.begin_frame();
    assert_eq!(canvas.render(), 1);
    let damage = canvas.renderer().frame_damage();
    let bounds = damage.bounds.unwrap();
    assert!(bounds.contains(Point::new(310.0, 210.0)));
    canvas.end_frame();
}
