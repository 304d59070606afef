#![allow(clippy::float_cmp)]

use boothmap::consts::{DATA_SCALE, KEY_SNAPSHOTS};
use boothmap::persist::Store;

use super::*;

// =============================================================
// Helpers
// =============================================================

fn row(label: &str, id: &str, machine: &str, sales: f64) -> Value {
    json!({
        "ラベルID": label,
        "ブースID": id,
        "対応マシン名": machine,
        "総売上": sales,
        "消化額": sales * 0.2,
        "width": 40.0 / DATA_SCALE,
        "depth": 40.0 / DATA_SCALE,
    })
}

fn scene_json(extra: Value) -> String {
    let mut scene = json!({
        "rows": [
            row("A", "A1", "UFO", 5000.0),
            row("B", "B1", "CRANE", 12000.0),
            row("C", "C1", "UFO", 20000.0),
        ],
        "canvas": { "width": 400.0, "height": 300.0 },
    });
    if let (Value::Object(base), Value::Object(more)) = (&mut scene, extra) {
        base.extend(more);
    }
    scene.to_string()
}

fn core_for(extra: Value) -> EngineCore<MemoryStore> {
    build_core(parse_scene(&scene_json(extra)).unwrap()).unwrap()
}

// =============================================================
// Scene loading
// =============================================================

#[test]
fn empty_scene_parses_with_defaults() {
    let scene = parse_scene("{}").unwrap();
    assert!(scene.rows.is_empty());
    assert!(scene.options.is_none());
    assert_eq!(scene.now_ms, 0.0);
}

#[test]
fn malformed_scene_is_json_error() {
    assert!(matches!(parse_scene("{rows"), Err(CliError::Json(_))));
}

#[test]
fn missing_file_is_io_error() {
    let err = read_scene(Path::new("/nonexistent/scene.json")).unwrap_err();
    assert!(matches!(err, CliError::Io { .. }));
    assert!(err.to_string().contains("/nonexistent/scene.json"));
}

// =============================================================
// Commands
// =============================================================

#[test]
fn bounds_follow_grid_and_offsets() {
    let core = core_for(json!({ "offsets": { "B": { "dx": 4.0, "dy": -2.0 } } }));
    let out = bounds(&core).unwrap();
    assert_eq!(out["groups"]["A"], json!({ "x": 0.0, "y": 0.0, "w": 40.0, "h": 40.0 }));
    assert_eq!(out["groups"]["B"]["x"], json!(72.0));
    assert_eq!(out["groups"]["B"]["y"], json!(-2.0));
    assert_eq!(out["contentRect"]["right"], json!(176.0));
}

#[test]
fn background_widens_world_rect() {
    let core = core_for(json!({ "background": { "width": 500.0, "height": 400.0 } }));
    let out = bounds(&core).unwrap();
    assert_eq!(out["worldRect"]["right"], json!(500.0));
    assert_eq!(out["worldRect"]["bottom"], json!(400.0));
}

#[test]
fn report_uses_legacy_threshold_options() {
    let core = core_for(json!({ "options": { "salesThreshold": 10000, "salesThresholdDir": "gte" } }));
    let report = &core.frame().report;
    assert_eq!(report.highlighted_ids, vec!["B1", "C1"]);
    assert!(report.blinking_ids.is_empty());
    assert_eq!(report.booths.len(), 3);
}

#[test]
fn report_respects_machine_filter() {
    let core = core_for(json!({ "selectedMachines": ["crane"] }));
    let ids: Vec<&str> = core.frame().report.booths.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["B1"]);
}

#[test]
fn view_command_fits_then_zooms() {
    let mut core = core_for(json!({}));
    core.set_viewport(CanvasSize::new(800.0, 600.0), Point::default());
    core.set_mode(ModeArg::X3.into());
    assert_eq!(core.state.view.scale, 3.0);
    assert_eq!(core.mode(), ViewMode::X3);
}

#[test]
fn snapshot_save_lists_book() {
    let mut core = core_for(json!({ "offsets": { "A": { "dx": 1.0, "dy": 2.0 } }, "nowMs": 42.0 }));
    let out = save_snapshot(&mut core, "first", 42.0).unwrap();
    assert_eq!(out["first"]["savedAt"], json!(42.0));
    assert_eq!(out["first"]["offsets"]["A"]["dx"], json!(1.0));
    assert!(core.store().get(KEY_SNAPSHOTS).is_some());
}

#[test]
fn blank_snapshot_name_is_rejected() {
    let mut core = core_for(json!({}));
    assert!(matches!(save_snapshot(&mut core, "  ", 0.0), Err(CliError::BlankSnapshotName)));
}

#[test]
fn snapshot_restore_from_scene_store() {
    let book = json!({ "saved": { "savedAt": 1.0, "offsets": { "C": { "dx": -10.0, "dy": 0.0 } } } });
    let mut store = serde_json::Map::new();
    store.insert(KEY_SNAPSHOTS.to_owned(), Value::String(book.to_string()));
    let mut core = core_for(json!({ "store": store }));
    let out = restore_snapshot(&mut core, "saved").unwrap();
    assert_eq!(out["groups"]["C"]["x"], json!(126.0));

    let err = restore_snapshot(&mut core, "other").unwrap_err();
    assert_eq!(err.to_string(), "unknown snapshot `other`");
}

#[test]
fn mode_arg_maps_to_view_mode() {
    assert_eq!(ViewMode::from(ModeArg::Fit), ViewMode::Fit);
    assert_eq!(ViewMode::from(ModeArg::X3), ViewMode::X3);
}

#[test]
fn cli_parses_view_arguments() {
    let cli = Cli::try_parse_from(["prizemap", "-v", "view", "scene.json", "--width", "800", "--height", "600", "--mode", "x3"])
        .unwrap();
    assert!(cli.verbose);
    match cli.command {
        Command::View { width, height, mode, .. } => {
            assert_eq!((width, height, mode), (800.0, 600.0, ModeArg::X3));
        }
        other => panic!("unexpected command {other:?}"),
    }
}
