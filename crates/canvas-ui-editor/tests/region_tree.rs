use canvas_ui::{HeadlessBackend, Point, Rect, Renderer, RendererConfig, Theme};
use canvas_ui_editor::{EditorKind, RegionFlags, RegionTree, TreeConfig};
use canvas_ui_interactive::SplitDirection;

fn tree(bounds: Rect, kind: EditorKind) -> (RegionTree, canvas_ui_editor::RegionId) {
    let mut tree = RegionTree::new(TreeConfig::default());
    let root = tree.create_root(bounds, kind);
    (tree, root)
}

#[test]
fn split_then_join_restores_editor() {
    for direction in [SplitDirection::Horizontal, SplitDirection::Vertical] {
        for join_second in [false, true] {
            let (mut tree, root) = tree(Rect::new([0.0, 0.0], [320.0, 240.0]), EditorKind::Outliner);
            let before = tree.editor(root).unwrap().id();

            let (first, second) = tree.split(root, direction, 0.5).unwrap();
            let joined = if join_second { second } else { first };
            assert!(tree.join_with_sibling(joined));

            let region = tree.get_region(root).unwrap();
            assert!(region.is_leaf());
            assert_eq!(tree.editor(root).unwrap().id(), before);
            assert_eq!(tree.editor(root).unwrap().kind(), EditorKind::Outliner);
            assert!(tree.get_region(first).is_none());
            assert!(tree.get_region(second).is_none());
            assert_eq!(tree.len(), 1);
        }
    }
}

#[test]
fn split_ratio_is_clamped_and_children_tile_parent() {
    let bounds = Rect::new([10.0, 20.0], [810.0, 620.0]);
    let gap = TreeConfig::default().splitter_gap;

    for direction in [SplitDirection::Horizontal, SplitDirection::Vertical] {
        let (mut tree, root) = tree(bounds, EditorKind::Viewport3D);
        let (first, second) = tree.split(root, direction, 0.5).unwrap();

        for requested in [-3.0, 0.0, 0.05, 0.1, 0.37, 0.5, 0.9, 0.97, 1.0, 12.0] {
            assert!(tree.set_split_ratio(root, requested));
            let ratio = tree.get_region(root).unwrap().split_ratio().unwrap();
            assert!((0.1..=0.9).contains(&ratio), "ratio {ratio} for {requested}");

            let a = tree.get_region(first).unwrap().bounds();
            let b = tree.get_region(second).unwrap().bounds();
            assert!(!a.intersects(&b));

            let (sum, extent) = match direction {
                SplitDirection::Horizontal => (a.height() + b.height(), bounds.height()),
                SplitDirection::Vertical => (a.width() + b.width(), bounds.width()),
            };
            assert!((sum + gap - extent).abs() < 1e-3);
        }
    }
}

#[test]
fn marking_is_idempotent() {
    let (mut tree, root) = tree(Rect::new([0.0, 0.0], [400.0, 300.0]), EditorKind::Console);
    let region = tree.get_region_mut(root).unwrap();
    region.clear_update_flags();
    assert!(!region.needs_update());

    region.mark_content_changed();
    let once = region.flags();
    region.mark_content_changed();
    assert_eq!(region.flags(), once);

    region.mark_layout_changed();
    region.mark_overlay_changed();
    let combined = region.flags();
    region.mark_overlay_changed();
    region.mark_layout_changed();
    assert_eq!(region.flags(), combined);

    region.clear_update_flags();
    assert!(!region.needs_update());
    assert!(region.flags().is_empty());
}

#[test]
fn nested_render_is_rejected_without_touching_flags() {
    let (mut tree, root) = tree(Rect::new([0.0, 0.0], [400.0, 300.0]), EditorKind::Properties);
    let mut renderer = Renderer::new(Box::new(HeadlessBackend::new()), RendererConfig::default());
    let theme = Theme::dark();
    renderer.begin_frame([400, 300]);

    let flags_before = tree.get_region(root).unwrap().flags();
    {
        let mut guard = tree.begin_draw(root).unwrap();
        assert!(guard.get_region(root).unwrap().is_drawing());

        // A render triggered while this region is drawing
        assert_eq!(guard.render_region(root, &mut renderer, &theme), 0);
        assert!(guard.begin_draw(root).is_none());
        // Structural edits are refused too
        assert!(guard.split(root, SplitDirection::Vertical, 0.5).is_none());

        let flags = guard.get_region(root).unwrap().flags();
        assert_eq!(flags, flags_before | RegionFlags::DRAWING);
    }

    let region = tree.get_region(root).unwrap();
    assert!(!region.is_drawing());
    assert_eq!(region.flags(), flags_before);

    // The guard released cleanly, so a normal render goes through
    assert_eq!(tree.render(&mut renderer, &theme), 1);
    renderer.end_frame();
}

#[test]
fn points_outside_root_find_nothing() {
    let (mut tree, root) = tree(Rect::new([0.0, 0.0], [400.0, 300.0]), EditorKind::Viewport3D);
    tree.split(root, SplitDirection::Horizontal, 0.5).unwrap();
    assert!(tree.find_region_at_point(Point::new(-1.0, 10.0)).is_none());
    assert!(tree.find_region_at_point(Point::new(10.0, 301.0)).is_none());
    // Inside the gap between the children
    assert!(tree.find_region_at_point(Point::new(10.0, 150.0)).is_none());
}

#[test]
fn drawing_state_is_released_when_a_draw_panics() {
    let (mut tree, root) = tree(Rect::new([0.0, 0.0], [400.0, 300.0]), EditorKind::Console);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _guard = tree.begin_draw(root).unwrap();
        panic!("editor failed while drawing");
    }));
    assert!(result.is_err());

    assert!(!tree.get_region(root).unwrap().is_drawing());
    assert!(tree.begin_draw(root).is_some());
}

#[test]
fn split_refuses_children_narrowed_by_the_gap() {
    let min = TreeConfig::default().min_region_size;
    let gap = TreeConfig::default().splitter_gap;

    let (mut tree, root) = tree(Rect::new([0.0, 0.0], [2.0 * min, 300.0]), EditorKind::Outliner);
    assert!(tree.split(root, SplitDirection::Vertical, 0.5).is_none());
    assert!(tree.get_region(root).unwrap().is_leaf());

    let (mut tree, root) = self::tree(Rect::new([0.0, 0.0], [2.0 * min + gap, 300.0]), EditorKind::Outliner);
    let (first, second) = tree.split(root, SplitDirection::Vertical, 0.5).unwrap();
    for child in [first, second] {
        assert!(tree.get_region(child).unwrap().bounds().width() >= min - 1e-3);
    }
}

#[test]
fn shrinking_a_split_keeps_children_above_minimum() {
    let min = TreeConfig::default().min_region_size;
    let (mut tree, root) = tree(Rect::new([0.0, 0.0], [1000.0, 600.0]), EditorKind::Viewport3D);
    let (main, side) = tree.split(root, SplitDirection::Vertical, 0.7).unwrap();
    let (_, bottom) = tree.split(side, SplitDirection::Vertical, 0.5).unwrap();

    // The side column now needs two minimum widths plus a gap
    tree.set_bounds(root, Rect::new([0.0, 0.0], [500.0, 600.0]));
    for leaf in tree.leaves() {
        let width = tree.get_region(leaf).unwrap().bounds().width();
        assert!(width >= min - 1e-3, "leaf {leaf:?} is {width} wide");
    }
    assert!(tree.get_region(main).unwrap().bounds().width() >= min);
    assert!(tree.get_region(bottom).unwrap().bounds().max[0] <= 500.0);
}
