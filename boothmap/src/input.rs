//! Input model: pointer tools, modifier keys, events, and the gesture state machine.
//!
//! The host forwards every DOM event as one [`InputEvent`]. [`Gesture`] is the
//! pointer gesture tracked between pointer-down and pointer-up; each active
//! variant carries exactly the context its move handler needs, so a group
//! drag and a rectangle-select can never be in flight at once. [`Pinch`]
//! tracks touches independently of the pointer gesture.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::booth::Label;
use crate::camera::Point;
use crate::consts::WHEEL_ZOOM_RATE;

/// What a plain primary-button drag does outside a booth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerTool {
    /// Drag pans the view (default).
    #[default]
    Pan,
    /// Drag draws a selection rectangle (in move mode).
    Rect,
}

impl PointerTool {
    /// Keyboard shortcut: `v` for pan, `r` for rect.
    #[must_use]
    pub fn from_key(key: &Key) -> Option<Self> {
        match key.0.as_str() {
            "v" | "V" => Some(Self::Pan),
            "r" | "R" => Some(Self::Rect),
            _ => None,
        }
    }

    /// CSS cursor while idle.
    #[must_use]
    pub fn cursor(self) -> &'static str {
        match self {
            Self::Pan => "grab",
            Self::Rect => "crosshair",
        }
    }
}

/// Modifier keys held during a pointer move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Shift key is held; locks drags to one axis.
    pub shift: bool,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Right mouse button; always pans.
    Secondary,
}

/// A keyboard key as reported by the browser (`KeyboardEvent.key`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn is_space(&self) -> bool {
        self.0 == " " || self.0 == "Space" || self.0 == "Spacebar"
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

impl WheelDelta {
    /// Scroll up zooms in.
    #[must_use]
    pub fn zoom_factor(self) -> f64 {
        (-self.dy * WHEEL_ZOOM_RATE).exp()
    }
}

/// Every event the engine reacts to. Points are client coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown { at: Point, button: Button },
    PointerMove { at: Point, modifiers: Modifiers },
    PointerUp { at: Point, button: Button },
    PointerLeave,
    Click { at: Point },
    DoubleClick { at: Point, now_ms: f64 },
    Wheel { at: Point, delta: WheelDelta },
    TouchStart { touches: Vec<Point> },
    TouchMove { touches: Vec<Point> },
    TouchEnd { touches: Vec<Point> },
    TouchCancel,
    KeyDown { key: Key, repeat: bool },
    KeyUp { key: Key },
    /// Animation frame.
    Tick { now_ms: f64 },
}

/// The pointer gesture in progress.
///
/// `last` is the client position of the previous pointer event.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    /// Waiting for the next pointer-down.
    #[default]
    Idle,
    /// Dragging the view. `forced` when space or the secondary button started it.
    Panning { last: Point, forced: bool },
    /// Drawing a selection rectangle; the corners live in the selection state.
    RectSelecting { last: Point },
    /// Moving one group.
    DraggingSingle { label: Label, last: Point },
    /// Moving every selected group together.
    DraggingGroup { labels: Vec<Label>, last: Point },
}

impl Gesture {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Record `at` as the previous pointer position.
    pub fn set_last(&mut self, at: Point) {
        match self {
            Self::Idle => {}
            Self::Panning { last, .. }
            | Self::RectSelecting { last }
            | Self::DraggingSingle { last, .. }
            | Self::DraggingGroup { last, .. } => *last = at,
        }
    }

    /// Labels whose offsets this gesture moves.
    #[must_use]
    pub fn moving_labels(&self) -> Vec<Label> {
        match self {
            Self::DraggingSingle { label, .. } => vec![label.clone()],
            Self::DraggingGroup { labels, .. } => labels.clone(),
            _ => Vec::new(),
        }
    }

    /// CSS cursor for this gesture, if it overrides the tool cursor.
    #[must_use]
    pub fn cursor(&self) -> Option<&'static str> {
        match self {
            Self::Idle => None,
            Self::Panning { .. } => Some("grabbing"),
            Self::RectSelecting { .. } => Some("crosshair"),
            Self::DraggingSingle { .. } | Self::DraggingGroup { .. } => Some("move"),
        }
    }
}

/// Touch tracking, independent of [`Gesture`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Pinch {
    #[default]
    None,
    /// One finger down.
    Panning { last: Point },
    /// Two fingers down; `last_dist` is their previous separation.
    Zooming { last_dist: f64 },
}

/// Zero the smaller-magnitude component. Ties keep the horizontal one.
#[must_use]
pub fn axis_lock(dx: f64, dy: f64) -> (f64, f64) {
    if dx.abs() >= dy.abs() { (dx, 0.0) } else { (0.0, dy) }
}
