//! Shared numeric constants for the booth map engine.

use crate::numeric::Rgba;

// ── View ────────────────────────────────────────────────────────

/// Scale applied before the first fit.
pub const INITIAL_SCALE: f64 = 4.0;

/// Lower zoom limit.
pub const MIN_SCALE: f64 = 0.25;

/// Upper zoom limit.
pub const MAX_SCALE: f64 = 16.0;

/// Scale targeted by the `x3` view mode.
pub const X3_SCALE: f64 = 3.0;

/// A scale within this distance of [`X3_SCALE`] counts as `x3`.
pub const X3_TOLERANCE: f64 = 0.001;

/// Wheel/pinch zoom may go this far below the fit scale.
pub const ZOOM_OUT_BELOW_FIT: f64 = 0.9;

/// Per-side margin in screen pixels used when fitting and clamping pan.
pub const FIT_MARGIN_PX: f64 = 12.0;

/// Per-side margin while a re-fit is blocked by move mode.
pub const BLOCKED_PAN_MARGIN_PX: f64 = 24.0;

// ── Layout ──────────────────────────────────────────────────────

/// Pixels per source unit for booth width/depth (1:4000 plan at 96 dpi).
pub const DATA_SCALE: f64 = 37.795 / 4000.0;

/// Groups per row when no column count is chosen.
pub const DEFAULT_COLS: usize = 3;

/// Content-space origin of the group grid.
pub const GRID_START_X: f64 = 0.0;
pub const GRID_START_Y: f64 = 0.0;

/// Gap between neighbouring groups.
pub const GRID_GAP_X: f64 = 28.0;
pub const GRID_GAP_Y: f64 = 28.0;

/// Gap between cells inside a group.
pub const CELL_GAP: f64 = 0.0;

/// Smallest cell side in pixels.
pub const MIN_CELL_PX: f64 = 3.0;

/// At most this many booths are laid out per group.
pub const MAX_ITEMS_PER_GROUP: usize = 4;

/// Groups sampled when estimating the column count.
pub const COLUMN_SAMPLE: usize = 8;

/// Assumed group width when nothing can be sampled.
pub const FALLBACK_GROUP_W: f64 = 260.0;

// ── Guides ──────────────────────────────────────────────────────

/// Alignment tolerance in screen pixels.
pub const GUIDE_EPSILON_PX: f64 = 6.0;

/// Guide lines overhang the aligned pair by this many screen pixels.
pub const GUIDE_PAD_PX: f64 = 24.0;

/// Candidates farther than this from the viewport are ignored (screen pixels).
pub const GUIDE_CULL_PX: f64 = 200.0;

/// Gaps up to `GAP_EPSILON_FACTOR * epsilon` are annotated.
pub const GAP_EPSILON_FACTOR: f64 = 8.0;

// ── Gestures ────────────────────────────────────────────────────

/// Wheel zoom sensitivity: `factor = exp(-delta_y * WHEEL_ZOOM_RATE)`.
pub const WHEEL_ZOOM_RATE: f64 = 0.0015;

/// Double-click zoom factor.
pub const DOUBLE_CLICK_ZOOM: f64 = 3.0;

/// Move mode stays suspended this long after a double-click fit.
pub const MOVE_MODE_RESTORE_MS: f64 = 60.0;

/// Manhattan distance before a right-button drag counts as moved.
pub const RIGHT_DRAG_SLOP_PX: f64 = 2.0;

// ── Blink ───────────────────────────────────────────────────────

/// Angular rate of the fill/stroke pulse, radians per millisecond.
pub const PULSE_RATE: f64 = 0.012;

/// Ring sweep rate for highlighted blinking cells, cycles per millisecond.
pub const RING_RATE: f64 = 0.0034;

/// Shade pulse: `base + span * |sin|`.
pub const SHADE_PULSE_BASE: f64 = 0.20;
pub const SHADE_PULSE_SPAN: f64 = 0.80;

/// Stroke pulse: `base + span * |sin|`.
pub const STROKE_PULSE_BASE: f64 = 0.55;
pub const STROKE_PULSE_SPAN: f64 = 0.45;

/// Stroke widths in screen pixels, with and without a known cost rate.
pub const RATE_STROKE_PX: f64 = 2.5;
pub const PLAIN_STROKE_PX: f64 = 1.5;

/// Desynchronizes ring phases between booths.
pub const RING_ID_MODULUS: usize = 997;

// ── Classification ──────────────────────────────────────────────

/// Cost is scaled by this factor before dividing by sales.
pub const COST_RATE_FACTOR: f64 = 1.1;

pub const DEFAULT_RANK_COUNT: u32 = 10;
pub const DEFAULT_QUANTILE: u32 = 4;
pub const MIN_QUANTILE: u32 = 2;
pub const MAX_QUANTILE: u32 = 10;

pub const DEFAULT_RATE_AT_MOST: f64 = 0.10;
pub const DEFAULT_RATE_AT_LEAST: f64 = 0.33;

pub const DEFAULT_BG_OPACITY: f64 = 0.35;
pub const DEFAULT_DIM_OPACITY: f64 = 0.35;

// ── Colors ──────────────────────────────────────────────────────

pub const RATE_LOW: Rgba = Rgba::rgb(0x3b, 0x82, 0xf6);
pub const RATE_MID: Rgba = Rgba::rgb(0xff, 0xff, 0xff);
pub const RATE_HIGH: Rgba = Rgba::rgb(0xef, 0x44, 0x44);
pub const RATE_UNKNOWN: Rgba = Rgba::rgb(0x9c, 0xa3, 0xaf);

/// Rate where the stroke ramp turns from blue to red.
pub const RATE_PIVOT: f64 = 0.30;

/// Rate where the stroke ramp reaches full red.
pub const RATE_CEILING: f64 = 0.38;

pub const SALES_LOW: Rgba = Rgba::rgb(0x25, 0x63, 0xeb);
pub const SALES_HIGH: Rgba = Rgba::rgb(0xdc, 0x26, 0x26);
pub const SALES_NEUTRAL: Rgba = Rgba::rgb(0xf9, 0xfa, 0xfb);

pub const GUIDE_COLOR: &str = "rgba(255,63,180,0.95)";
pub const GUIDE_SNAPPED_COLOR: &str = "rgba(16,247,176,0.95)";

// ── Persistence keys ────────────────────────────────────────────

pub const KEY_VIEW: &str = "prizemap:view";
pub const KEY_OFFSETS: &str = "prizemap:offsets";
pub const KEY_ROTATIONS: &str = "prizemap:rotations";
pub const KEY_SELECTION: &str = "prizemap:selection";
pub const KEY_MACHINES: &str = "prizemap:machines";
pub const KEY_SNAPSHOTS: &str = "prizemap:offsets:snapshots";
