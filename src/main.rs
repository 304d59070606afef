//! Headless inspector for booth maps.
//!
//! Loads a JSON scene (spreadsheet rows plus the persisted view state), runs
//! the engine without a browser and prints what a frame would publish.

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

use std::path::{Path, PathBuf};

use boothmap::booth::{Dataset, Row};
use boothmap::camera::{CanvasSize, Point, ViewMode};
use boothmap::consts::{KEY_MACHINES, KEY_OFFSETS, KEY_ROTATIONS, KEY_VIEW};
use boothmap::engine::EngineCore;
use boothmap::persist::{MemoryStore, OffsetMap, PersistError, Persistence, RotationMap};
use boothmap::scene::Background;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::Level;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("persistence failed: {0}")]
    Persist(#[from] PersistError),
    #[error("unknown snapshot `{0}`")]
    UnknownSnapshot(String),
    #[error("snapshot name must not be blank")]
    BlankSnapshotName,
}

#[derive(Parser, Debug)]
#[command(name = "prizemap", about = "Inspect booth map layouts and highlight results")]
struct Cli {
    /// Log engine decisions at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Highlighted and blinking booth ids with per-booth records.
    Report { scene: PathBuf },
    /// Group rectangles plus the content and world rectangles.
    Bounds { scene: PathBuf },
    /// The view state after fitting to a canvas.
    View {
        scene: PathBuf,
        #[arg(long)]
        width: f64,
        #[arg(long)]
        height: f64,
        #[arg(long, value_enum, default_value_t = ModeArg::Fit)]
        mode: ModeArg,
    },
    /// Save the scene's offsets as a snapshot, or restore one.
    Snapshot {
        scene: PathBuf,
        #[arg(long)]
        name: String,
        /// Restore the named snapshot from the scene's store instead of saving.
        #[arg(long, default_value_t = false)]
        restore: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ModeArg {
    Fit,
    X3,
}

impl From<ModeArg> for ViewMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Fit => Self::Fit,
            ModeArg::X3 => Self::X3,
        }
    }
}

/// Input file: rows plus whatever the page would have in storage.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Scene {
    rows: Vec<Row>,
    background: Option<Background>,
    canvas: Option<CanvasSize>,
    /// Any stored options shape, legacy included.
    options: Option<Value>,
    offsets: OffsetMap,
    rotations: RotationMap,
    selected_machines: Vec<String>,
    now_ms: f64,
    /// Extra raw storage entries, e.g. saved snapshots.
    store: MemoryStore,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_max_level(level).init();

    let out = run(cli.command)?;
    print_json(&out)
}

fn run(command: Command) -> Result<Value, CliError> {
    match command {
        Command::Report { scene } => {
            let core = build_core(read_scene(&scene)?)?;
            Ok(serde_json::to_value(&core.frame().report)?)
        }
        Command::Bounds { scene } => {
            let core = build_core(read_scene(&scene)?)?;
            bounds(&core)
        }
        Command::View { scene, width, height, mode } => {
            let mut core = build_core(read_scene(&scene)?)?;
            core.set_viewport(CanvasSize::new(width, height), Point::default());
            core.set_mode(mode.into());
            Ok(serde_json::to_value(core.state.view)?)
        }
        Command::Snapshot { scene, name, restore } => {
            let scene = read_scene(&scene)?;
            let now_ms = scene.now_ms;
            let mut core = build_core(scene)?;
            if restore {
                restore_snapshot(&mut core, &name)
            } else {
                save_snapshot(&mut core, &name, now_ms)
            }
        }
    }
}

fn read_scene(path: &Path) -> Result<Scene, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io { path: path.to_owned(), source })?;
    parse_scene(&text)
}

fn parse_scene(text: &str) -> Result<Scene, CliError> {
    Ok(serde_json::from_str(text)?)
}

/// Seed a store from the scene, load it through the engine and lay out one frame.
fn build_core(scene: Scene) -> Result<EngineCore<MemoryStore>, CliError> {
    let mut persistence = Persistence::new(scene.store);
    if let Some(options) = &scene.options {
        persistence.save(KEY_VIEW, options)?;
    }
    persistence.save(KEY_OFFSETS, &scene.offsets)?;
    persistence.save(KEY_ROTATIONS, &scene.rotations)?;
    persistence.save(KEY_MACHINES, &scene.selected_machines)?;

    let mut core = EngineCore::new(persistence.into_store());
    if let Some(canvas) = scene.canvas {
        core.set_viewport(canvas, Point::default());
    }
    let dataset = Dataset::from_rows(&scene.rows);
    tracing::debug!(groups = dataset.labels().len(), "scene loaded");
    core.load_dataset(dataset, scene.background);
    core.redraw(scene.now_ms);
    Ok(core)
}

fn bounds(core: &EngineCore<MemoryStore>) -> Result<Value, CliError> {
    let frame = core.frame();
    Ok(json!({
        "groups": serde_json::to_value(&frame.group_bounds)?,
        "contentRect": serde_json::to_value(frame.content_rect)?,
        "worldRect": serde_json::to_value(frame.world_rect)?,
    }))
}

fn save_snapshot(core: &mut EngineCore<MemoryStore>, name: &str, now_ms: f64) -> Result<Value, CliError> {
    if !core.save_snapshot(name, now_ms) {
        return Err(CliError::BlankSnapshotName);
    }
    Ok(serde_json::to_value(core.snapshots())?)
}

fn restore_snapshot(core: &mut EngineCore<MemoryStore>, name: &str) -> Result<Value, CliError> {
    if !core.restore_snapshot(name) {
        return Err(CliError::UnknownSnapshot(name.to_owned()));
    }
    bounds(core)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
