#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;
use crate::classify::{BlinkConfig, HighlightConfig};
use crate::consts::DATA_SCALE;
use crate::options::OPTIONS_VERSION;
use crate::persist::{MemoryStore, Offset};

// =============================================================
// Helpers
// =============================================================

fn booth_row(label: &str, machine: &str, sales: f64) -> Row {
    serde_json::from_value(json!({
        "label": label,
        "boothId": format!("{label}1"),
        "machine": machine,
        "sales": sales,
        "cost": sales * 0.25,
        "width": 40.0 / DATA_SCALE,
        "depth": 40.0 / DATA_SCALE,
    }))
    .unwrap()
}

/// Three single-booth 40x40 groups at x = 0, 68, 136.
fn dataset() -> Dataset {
    Dataset::from_rows(&[
        booth_row("A", "UFO", 5000.0),
        booth_row("B", "CRANE", 12000.0),
        booth_row("C", "UFO", 20000.0),
    ])
}

fn canvas() -> CanvasSize {
    CanvasSize::new(400.0, 300.0)
}

fn core_with(store: MemoryStore) -> EngineCore<MemoryStore> {
    let mut core = EngineCore::new(store);
    core.load_dataset(dataset(), None);
    core.set_viewport(canvas(), Point::default());
    core
}

fn core() -> EngineCore<MemoryStore> {
    core_with(MemoryStore::new())
}

fn set_view(core: &mut EngineCore<MemoryStore>, scale: f64, tx: f64, ty: f64) {
    core.state.view.scale = scale;
    core.state.view.tx = tx;
    core.state.view.ty = ty;
}

fn down(x: f64, y: f64) -> InputEvent {
    InputEvent::PointerDown { at: Point::new(x, y), button: Button::Primary }
}

fn right_down(x: f64, y: f64) -> InputEvent {
    InputEvent::PointerDown { at: Point::new(x, y), button: Button::Secondary }
}

fn mv(x: f64, y: f64) -> InputEvent {
    InputEvent::PointerMove { at: Point::new(x, y), modifiers: Modifiers::default() }
}

fn mv_shift(x: f64, y: f64) -> InputEvent {
    InputEvent::PointerMove { at: Point::new(x, y), modifiers: Modifiers { shift: true } }
}

fn up(x: f64, y: f64) -> InputEvent {
    InputEvent::PointerUp { at: Point::new(x, y), button: Button::Primary }
}

fn key_down(k: &str) -> InputEvent {
    InputEvent::KeyDown { key: Key(k.into()), repeat: false }
}

fn stored<T: serde::de::DeserializeOwned>(core: &EngineCore<MemoryStore>, key: &str) -> T {
    serde_json::from_str(&core.store().get(key).unwrap()).unwrap()
}

fn has_mode_change(actions: &[Action], mode: ViewMode) -> bool {
    actions.contains(&Action::ModeChanged(mode))
}

// =============================================================
// Construction and data
// =============================================================

#[test]
fn load_dataset_lays_out_groups() {
    let core = core();
    let b = &core.frame().group_bounds;
    assert_eq!(b["A"], Bounds::new(0.0, 0.0, 40.0, 40.0));
    assert_eq!(b["B"], Bounds::new(68.0, 0.0, 40.0, 40.0));
    assert_eq!(b["C"], Bounds::new(136.0, 0.0, 40.0, 40.0));
    assert_eq!(core.world_rect(), Rect::new(0.0, 0.0, 176.0, 40.0));
}

#[test]
fn load_dataset_fits_view() {
    let core = core();
    assert_eq!(core.mode(), ViewMode::Fit);
    let expected = (376.0_f64 / 176.0).min(276.0 / 40.0);
    assert!((core.state.view.scale - expected).abs() < 1e-9);
}

#[test]
fn load_and_resize_fit_content_not_background() {
    let mut core = EngineCore::new(MemoryStore::new());
    core.set_viewport(canvas(), Point::default());
    core.load_dataset(dataset(), Some(Background { width: 4000.0, height: 3000.0 }));
    let content_fit = (376.0_f64 / 176.0).min(276.0 / 40.0);
    assert_eq!(core.mode(), ViewMode::Fit);
    assert!((core.state.view.scale - content_fit).abs() < 1e-9);

    core.set_viewport(CanvasSize::new(800.0, 300.0), Point::default());
    let wider_fit = (776.0_f64 / 176.0).min(276.0 / 40.0);
    assert!((core.state.view.scale - wider_fit).abs() < 1e-9);

    // the explicit view API still fits the whole world
    core.reset();
    assert!(core.state.view.scale < 1.0);
}

#[test]
fn new_restores_persisted_state() {
    let mut store = MemoryStore::new();
    store.set(KEY_OFFSETS, r#"{"A":{"dx":3,"dy":4}}"#).unwrap();
    store.set(KEY_SELECTION, r#"{"activeLabel":"B","selectedLabels":["A","C"]}"#).unwrap();
    store.set(KEY_ROTATIONS, r#"{"A":"90"}"#).unwrap();
    store.set(KEY_MACHINES, r#"["UFO"]"#).unwrap();
    let core = core_with(store);

    assert_eq!(core.state.offsets["A"], Offset { dx: 3.0, dy: 4.0 });
    assert_eq!(core.state.active_label.as_deref(), Some("B"));
    assert_eq!(core.state.selected_labels.iter().cloned().collect::<Vec<_>>(), vec!["A", "C"]);
    assert_eq!(core.state.rotations.get("A"), 90.0);
    assert!(core.state.filter.is_active());
    assert_eq!(core.frame().group_bounds["A"].x, 3.0);
}

#[test]
fn malformed_persisted_state_falls_back() {
    let mut store = MemoryStore::new();
    store.set(KEY_OFFSETS, "{not json").unwrap();
    store.set(KEY_VIEW, "[]").unwrap();
    let core = core_with(store);
    assert!(core.state.offsets.is_empty());
    assert_eq!(core.state.options, ViewOptions::default());
}

// =============================================================
// View API
// =============================================================

#[test]
fn set_mode_x3_and_reset() {
    let mut core = core();
    let actions = core.set_mode(ViewMode::X3);
    assert!(has_mode_change(&actions, ViewMode::X3));
    assert_eq!(core.state.view.scale, 3.0);

    let actions = core.reset();
    assert!(has_mode_change(&actions, ViewMode::Fit));
    assert_eq!(core.mode(), ViewMode::Fit);
}

#[test]
fn set_mode_free_means_fit() {
    let mut core = core();
    core.set_mode(ViewMode::X3);
    core.set_mode(ViewMode::Free);
    assert_eq!(core.mode(), ViewMode::Fit);
}

#[test]
fn set_mode_blocked_in_move_mode() {
    let mut core = core();
    core.set_move_mode(true);
    let before = core.state.view.scale;
    let actions = core.set_mode(ViewMode::X3);
    assert!(!has_mode_change(&actions, ViewMode::X3));
    assert_eq!(core.state.view.scale, before);
    assert_eq!(core.mode(), ViewMode::Fit);
}

#[test]
fn viewport_resize_in_move_mode_keeps_center() {
    let mut core = core();
    core.set_move_mode(true);
    set_view(&mut core, 4.0, -150.0, 70.0);
    let center = core.state.view.screen_to_content(canvas().center(), Point::default());

    core.set_viewport(CanvasSize::new(500.0, 300.0), Point::default());
    let after = core.state.view.screen_to_content(Point::new(250.0, 150.0), Point::default());
    assert!((after.x - center.x).abs() < 1e-9);
    assert_eq!(core.state.view.scale, 4.0);
}

// =============================================================
// Pointer: pan, drag, rectangle select
// =============================================================

#[test]
fn pan_tool_drag_pans_and_clamps() {
    let mut core = core();
    set_view(&mut core, 4.0, 0.0, 70.0);
    core.dispatch(down(170.0, 10.0));
    assert!(matches!(core.state.gesture, Gesture::Panning { forced: false, .. }));
    core.dispatch(mv(120.0, 10.0));
    assert_eq!(core.state.view.tx, -50.0);

    core.dispatch(mv(-1000.0, 10.0));
    assert_eq!(core.state.view.tx, 400.0 - 176.0 * 4.0 - FIT_MARGIN_PX);
}

#[test]
fn drag_moves_offset_in_content_units() {
    let mut core = core();
    core.set_move_mode(true);
    set_view(&mut core, 2.0, 0.0, 0.0);

    let actions = core.dispatch(down(20.0, 20.0));
    assert!(actions.contains(&Action::ActiveLabelChanged(Some("A".into()))));
    assert!(matches!(core.state.gesture, Gesture::DraggingSingle { ref label, .. } if label == "A"));

    core.dispatch(mv(30.0, 20.0));
    assert_eq!(core.state.offsets["A"], Offset { dx: 5.0, dy: 0.0 });
    assert_eq!(core.frame().group_bounds["A"].x, 5.0);

    let saved: OffsetMap = stored(&core, KEY_OFFSETS);
    assert_eq!(saved["A"], Offset { dx: 5.0, dy: 0.0 });
}

#[test]
fn shift_drag_locks_axis() {
    let mut core = core();
    core.set_move_mode(true);
    set_view(&mut core, 1.0, 0.0, 0.0);
    core.dispatch(down(20.0, 20.0));
    core.dispatch(mv_shift(30.0, 23.0));
    assert_eq!(core.state.offsets["A"], Offset { dx: 10.0, dy: 0.0 });
}

#[test]
fn drag_of_selected_group_moves_whole_selection() {
    let mut core = core();
    core.set_move_mode(true);
    set_view(&mut core, 1.0, 0.0, 0.0);
    core.state.selected_labels = ["A".to_owned(), "C".to_owned()].into();

    core.dispatch(down(20.0, 20.0));
    assert!(matches!(core.state.gesture, Gesture::DraggingGroup { .. }));
    core.dispatch(mv(20.0, 35.0));
    assert_eq!(core.state.offsets["A"], Offset { dx: 0.0, dy: 15.0 });
    assert_eq!(core.state.offsets["C"], Offset { dx: 0.0, dy: 15.0 });
    assert!(!core.state.offsets.contains_key("B"));
}

#[test]
fn drag_shows_guides_until_release() {
    let mut core = core();
    core.set_move_mode(true);
    set_view(&mut core, 1.0, 0.0, 0.0);
    core.dispatch(down(20.0, 20.0));
    core.dispatch(mv(21.0, 20.0));
    assert!(!core.state.guides.is_empty());

    core.dispatch(up(21.0, 20.0));
    assert!(core.state.guides.is_empty());
    assert!(core.state.gesture.is_idle());
}

#[test]
fn drag_outside_move_mode_pans_instead() {
    let mut core = core();
    set_view(&mut core, 1.0, 0.0, 0.0);
    core.dispatch(down(20.0, 20.0));
    core.dispatch(mv(30.0, 20.0));
    assert!(core.state.offsets.is_empty());
    assert_eq!(core.state.active_label.as_deref(), Some("A"));
}

#[test]
fn rect_select_picks_touched_groups() {
    let mut core = core();
    core.set_move_mode(true);
    core.set_tool(PointerTool::Rect);
    set_view(&mut core, 1.0, 0.0, 0.0);

    core.dispatch(down(120.0, 50.0));
    assert!(matches!(core.state.gesture, Gesture::RectSelecting { .. }));
    core.dispatch(mv(0.0, 0.0));
    assert_eq!(core.state.select_rect.map(|r| r.bounds()), Some(Bounds::new(0.0, 0.0, 120.0, 50.0)));

    let actions = core.dispatch(up(0.0, 0.0));
    assert!(actions.contains(&Action::SelectionChanged(vec!["A".into(), "B".into()])));
    assert_eq!(core.state.selected_labels.len(), 2);
    assert!(core.state.select_rect.is_none());

    let saved: SavedSelection = stored(&core, KEY_SELECTION);
    assert_eq!(saved.selected_labels, vec!["A", "B"]);
}

#[test]
fn rect_select_start_clears_previous_selection() {
    let mut core = core();
    core.set_move_mode(true);
    core.set_tool(PointerTool::Rect);
    set_view(&mut core, 1.0, 0.0, 0.0);
    core.state.selected_labels = ["C".to_owned()].into();

    let actions = core.dispatch(down(120.0, 50.0));
    assert!(actions.contains(&Action::SelectionChanged(Vec::new())));
    assert!(core.state.selected_labels.is_empty());
}

#[test]
fn pointer_leave_abandons_rect_select() {
    let mut core = core();
    core.set_move_mode(true);
    core.set_tool(PointerTool::Rect);
    set_view(&mut core, 1.0, 0.0, 0.0);
    core.dispatch(down(120.0, 50.0));
    core.dispatch(mv(0.0, 0.0));
    core.dispatch(InputEvent::PointerLeave);

    assert!(core.state.select_rect.is_none());
    assert!(core.state.gesture.is_idle());
    let actions = core.dispatch(up(0.0, 0.0));
    assert!(!actions.iter().any(|a| matches!(a, Action::SelectionChanged(v) if !v.is_empty())));
}

#[test]
fn leaving_move_mode_clears_selection() {
    let mut core = core();
    core.set_move_mode(true);
    core.state.selected_labels = ["A".to_owned()].into();
    let actions = core.set_move_mode(false);
    assert!(actions.contains(&Action::SelectionChanged(Vec::new())));
    assert!(core.state.selected_labels.is_empty());
}

#[test]
fn space_forces_pan_in_move_mode() {
    let mut core = core();
    core.set_move_mode(true);
    set_view(&mut core, 4.0, 0.0, 70.0);
    core.dispatch(key_down(" "));
    core.dispatch(down(20.0, 90.0));
    assert!(matches!(core.state.gesture, Gesture::Panning { forced: true, .. }));
    core.dispatch(mv(10.0, 90.0));
    assert!(core.state.offsets.is_empty());
    assert_eq!(core.state.view.tx, -10.0);

    core.dispatch(up(10.0, 90.0));
    assert!(!core.state.space_held);
}

// =============================================================
// Context menu
// =============================================================

#[test]
fn context_menu_follows_tool_and_right_drag() {
    let mut core = core();
    assert!(!core.context_menu_allowed());

    core.set_tool(PointerTool::Rect);
    assert!(core.context_menu_allowed());

    set_view(&mut core, 4.0, 0.0, 70.0);
    core.dispatch(right_down(200.0, 10.0));
    core.dispatch(mv(201.0, 10.0));
    assert!(core.context_menu_allowed());
    core.dispatch(mv(211.0, 10.0));
    assert!(!core.context_menu_allowed());

    core.dispatch(right_down(200.0, 10.0));
    assert!(core.context_menu_allowed());
}

// =============================================================
// Hover and click
// =============================================================

#[test]
fn hover_reports_changes_only() {
    let mut core = core();
    let over_a = core.state.view.content_to_screen(Point::new(20.0, 20.0));

    let actions = core.dispatch(mv(over_a.x, over_a.y));
    assert!(actions.contains(&Action::SetCursor("pointer".into())));
    assert!(actions.iter().any(|a| matches!(a, Action::Hover(Some(h)) if h.label == "A")));

    let actions = core.dispatch(mv(over_a.x + 1.0, over_a.y));
    assert!(!actions.iter().any(|a| matches!(a, Action::Hover(_))));

    let actions = core.dispatch(mv(1.0, 1.0));
    assert!(actions.contains(&Action::Hover(None)));
    assert!(actions.contains(&Action::SetCursor("grab".into())));
}

#[test]
fn hover_cursor_in_move_mode() {
    let mut core = core();
    core.set_move_mode(true);
    let over_b = core.state.view.content_to_screen(Point::new(88.0, 20.0));
    let actions = core.dispatch(mv(over_b.x, over_b.y));
    assert!(actions.contains(&Action::SetCursor("move".into())));
}

#[test]
fn click_sets_and_clears_active_label() {
    let mut core = core();
    let over_c = core.state.view.content_to_screen(Point::new(150.0, 10.0));
    let actions = core.dispatch(InputEvent::Click { at: over_c });
    assert!(actions.contains(&Action::ActiveLabelChanged(Some("C".into()))));
    assert!(core.frame().groups.iter().any(|g| g.label == "C" && g.active));

    let actions = core.dispatch(InputEvent::Click { at: Point::new(1.0, 1.0) });
    assert!(actions.contains(&Action::ActiveLabelChanged(None)));
    let saved: SavedSelection = stored(&core, KEY_SELECTION);
    assert_eq!(saved.active_label, None);
}

#[test]
fn hit_respects_canvas_origin() {
    let mut core = core();
    core.set_viewport(canvas(), Point::new(100.0, 50.0));
    let over_a = core.state.view.content_to_screen(Point::new(20.0, 20.0));
    let client = Point::new(over_a.x + 100.0, over_a.y + 50.0);
    assert_eq!(core.hit_at(client).map(|h| h.label.as_str()), Some("A"));
}

// =============================================================
// Zoom: wheel, double-click, pinch
// =============================================================

#[test]
fn wheel_zooms_in_and_goes_free() {
    let mut core = core();
    let before = core.state.view.scale;
    let actions = core.dispatch(InputEvent::Wheel { at: Point::new(200.0, 150.0), delta: WheelDelta { dx: 0.0, dy: -100.0 } });
    assert!(core.state.view.scale > before);
    assert!(has_mode_change(&actions, ViewMode::Free));
}

#[test]
fn double_click_toggles_zoom_and_fit() {
    let mut core = core();
    let fit = core.state.view.scale;
    let at = Point::new(200.0, 150.0);

    let actions = core.dispatch(InputEvent::DoubleClick { at, now_ms: 0.0 });
    assert!((core.state.view.scale - fit * DOUBLE_CLICK_ZOOM).abs() < 1e-9);
    assert!(has_mode_change(&actions, ViewMode::Free));
    assert!(core.state.dbl_zoomed);

    let actions = core.dispatch(InputEvent::DoubleClick { at, now_ms: 10.0 });
    assert!(has_mode_change(&actions, ViewMode::Fit));
    assert!((core.state.view.scale - fit).abs() < 1e-9);
    assert!(!core.state.dbl_zoomed);
}

#[test]
fn double_click_fit_suspends_and_restores_move_mode() {
    let mut core = core();
    core.set_move_mode(true);
    let at = Point::new(200.0, 150.0);
    core.dispatch(InputEvent::DoubleClick { at, now_ms: 0.0 });
    core.dispatch(InputEvent::DoubleClick { at, now_ms: 1000.0 });

    assert!(!core.state.move_mode);
    assert_eq!(core.mode(), ViewMode::Fit);
    core.dispatch(InputEvent::Tick { now_ms: 1059.0 });
    assert!(!core.state.move_mode);
    let actions = core.dispatch(InputEvent::Tick { now_ms: 1060.0 });
    assert!(core.state.move_mode);
    assert!(actions.contains(&Action::RenderNeeded));
}

#[test]
fn explicit_move_mode_cancels_pending_restore() {
    let mut core = core();
    core.set_move_mode(true);
    let at = Point::new(200.0, 150.0);
    core.dispatch(InputEvent::DoubleClick { at, now_ms: 0.0 });
    core.dispatch(InputEvent::DoubleClick { at, now_ms: 100.0 });
    core.set_move_mode(false);
    core.dispatch(InputEvent::Tick { now_ms: 500.0 });
    assert!(!core.state.move_mode);
}

#[test]
fn pinch_zooms_by_distance_ratio() {
    let mut core = core();
    let before = core.state.view.scale;
    core.dispatch(InputEvent::TouchStart { touches: vec![Point::new(100.0, 100.0), Point::new(200.0, 100.0)] });
    core.dispatch(InputEvent::TouchMove { touches: vec![Point::new(50.0, 100.0), Point::new(250.0, 100.0)] });
    assert!((core.state.view.scale - before * 2.0).abs() < 1e-9);
}

#[test]
fn lifting_one_finger_rebases_pan() {
    let mut core = core();
    set_view(&mut core, 4.0, 0.0, 70.0);
    core.dispatch(InputEvent::TouchStart { touches: vec![Point::new(100.0, 100.0), Point::new(200.0, 100.0)] });
    core.dispatch(InputEvent::TouchEnd { touches: vec![Point::new(200.0, 100.0)] });
    assert_eq!(core.state.pinch, Pinch::Panning { last: Point::new(200.0, 100.0) });

    core.dispatch(InputEvent::TouchMove { touches: vec![Point::new(180.0, 100.0)] });
    assert_eq!(core.state.view.tx, -20.0);

    core.dispatch(InputEvent::TouchCancel);
    assert_eq!(core.state.pinch, Pinch::None);
}

// =============================================================
// Keyboard
// =============================================================

#[test]
fn tool_shortcuts() {
    let mut core = core();
    let actions = core.dispatch(key_down("r"));
    assert_eq!(actions, vec![Action::ToolChanged(PointerTool::Rect), Action::SetCursor("crosshair".into())]);
    assert!(core.dispatch(key_down("R")).is_empty());

    let actions = core.dispatch(key_down("V"));
    assert!(actions.contains(&Action::ToolChanged(PointerTool::Pan)));
}

#[test]
fn key_repeat_is_ignored_but_space_still_held() {
    let mut core = core();
    assert!(core.dispatch(InputEvent::KeyDown { key: Key("r".into()), repeat: true }).is_empty());
    assert_eq!(core.state.tool, PointerTool::Pan);

    core.dispatch(InputEvent::KeyDown { key: Key("Space".into()), repeat: true });
    assert!(core.state.space_held);
    core.dispatch(InputEvent::KeyUp { key: Key("Space".into()) });
    assert!(!core.state.space_held);
}

// =============================================================
// Rotation
// =============================================================

#[test]
fn rotation_requires_move_mode_and_active_label() {
    let mut core = core();
    core.state.active_label = Some("A".into());
    assert!(!core.rotate_active(15.0));

    core.set_move_mode(true);
    core.state.active_label = None;
    assert!(!core.rotate_active(15.0));
}

#[test]
fn rotate_and_reset_active_group() {
    let mut core = core();
    core.set_move_mode(true);
    core.state.active_label = Some("B".into());

    assert!(core.rotate_active(-15.0));
    assert_eq!(core.state.rotations.get("B"), 345.0);
    assert!(core.frame().groups.iter().any(|g| g.label == "B" && g.rotation == 345.0));
    let saved: RotationMap = stored(&core, KEY_ROTATIONS);
    assert_eq!(saved.get("B"), 345.0);

    assert!(core.reset_active_rotation());
    assert_eq!(core.state.rotations.get("B"), 0.0);
}

// =============================================================
// Offsets and snapshots
// =============================================================

#[test]
fn snapshot_save_and_restore() {
    let mut core = core();
    core.state.offsets.insert("A".into(), Offset { dx: 10.0, dy: 0.0 });
    assert!(core.save_snapshot("  layout one ", 100.0));
    assert!(!core.save_snapshot("   ", 200.0));

    core.clear_offsets();
    assert!(core.state.offsets.is_empty());

    assert!(core.restore_snapshot("layout one"));
    assert_eq!(core.state.offsets["A"], Offset { dx: 10.0, dy: 0.0 });
    assert_eq!(core.frame().group_bounds["A"].x, 10.0);
    let saved: OffsetMap = stored(&core, KEY_OFFSETS);
    assert_eq!(saved["A"].dx, 10.0);
}

#[test]
fn restore_unknown_snapshot_keeps_offsets() {
    let mut core = core();
    core.state.offsets.insert("A".into(), Offset { dx: 1.0, dy: 2.0 });
    assert!(!core.restore_snapshot("missing"));
    assert_eq!(core.state.offsets["A"], Offset { dx: 1.0, dy: 2.0 });
}

#[test]
fn snapshot_names_newest_first() {
    let mut core = core();
    core.save_snapshot("old", 1.0);
    core.save_snapshot("new", 2.0);
    assert_eq!(core.snapshot_names(), vec!["new", "old"]);
    assert_eq!(core.snapshots().len(), 2);
}

#[test]
fn clear_offsets_resets_layout_and_selection() {
    let mut core = core();
    core.state.offsets.insert("B".into(), Offset { dx: 50.0, dy: 50.0 });
    core.state.selected_labels = ["B".to_owned()].into();
    let actions = core.clear_offsets();
    assert!(actions.contains(&Action::SelectionChanged(Vec::new())));
    assert_eq!(core.frame().group_bounds["B"].x, 68.0);
    assert_eq!(core.store().get(KEY_OFFSETS), None);
}

// =============================================================
// Options, filter, redraw
// =============================================================

#[test]
fn set_options_persists_normalized() {
    let mut core = core();
    let options = ViewOptions {
        show_label: false,
        highlight: HighlightConfig {
            blink: BlinkConfig { rate_at_most: 25.0, ..BlinkConfig::default() },
            ..HighlightConfig::default()
        },
        ..ViewOptions::default()
    };
    core.set_options(options);
    assert_eq!(core.state.options.highlight.blink.rate_at_most, 0.25);
    let saved: ViewOptions = stored(&core, KEY_VIEW);
    assert!(!saved.show_label);
    assert_eq!(saved.highlight.blink.rate_at_most, 0.25);
}

#[test]
fn set_options_clamps_opacities() {
    let mut core = core();
    core.set_options(ViewOptions { dim_opacity: 3.0, bg_opacity: -1.0, version: 0, ..ViewOptions::default() });
    assert_eq!(core.state.options.dim_opacity, 1.0);
    assert_eq!(core.state.options.bg_opacity, 0.0);
    assert_eq!(core.state.options.version, OPTIONS_VERSION);
    let saved: ViewOptions = stored(&core, KEY_VIEW);
    assert_eq!(saved.dim_opacity, 1.0);
}

#[test]
fn machine_filter_dims_other_machines() {
    let mut core = core();
    core.set_selected_machines(vec!["ufo".into()]);
    assert!(core.state.filter.is_active());
    let saved: Vec<String> = stored(&core, KEY_MACHINES);
    assert_eq!(saved, vec!["ufo"]);
    let ids: Vec<&str> = core.frame().report.booths.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["A1", "C1"]);
}

#[test]
fn tick_redraws_only_while_blinking() {
    let mut core = core();
    core.take_redraw_request();
    assert!(core.dispatch(InputEvent::Tick { now_ms: 16.0 }).is_empty());
    assert!(!core.take_redraw_request());

    let mut options = ViewOptions::default();
    options.highlight.blink.enabled = true;
    core.set_options(options);
    assert!(core.blink_ticker_active());
    let actions = core.dispatch(InputEvent::Tick { now_ms: 32.0 });
    assert_eq!(actions, vec![Action::RenderNeeded]);
    assert!(core.take_redraw_request());
    assert!(!core.take_redraw_request());
}

#[test]
fn redraw_uses_given_time() {
    let mut core = core();
    core.request_redraw();
    let frame = core.redraw(1234.0).clone();
    assert_eq!(core.state.now_ms, 1234.0);
    assert!(!core.take_redraw_request());
    assert_eq!(frame.hit_rects.len(), 3);
}
