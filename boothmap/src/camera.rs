//! View model: pan/zoom/fit state over the world rectangle.
//!
//! Screen points are CSS pixels relative to the canvas. Content points are
//! the unscaled layout space. `screen = content * scale + (tx, ty)`.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::consts::{
    BLOCKED_PAN_MARGIN_PX, FIT_MARGIN_PX, INITIAL_SCALE, MAX_SCALE, MIN_SCALE, X3_SCALE, X3_TOLERANCE,
    ZOOM_OUT_BELOW_FIT,
};
use crate::numeric::clamp;

/// A point in either screen or content space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }
}

/// Axis-aligned rectangle by its edges.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    #[must_use]
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, top, right, bottom }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Both sides finite and strictly positive.
    #[must_use]
    pub fn has_area(&self) -> bool {
        let (w, h) = (self.width(), self.height());
        w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// Canvas size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.width * 0.5, self.height * 0.5)
    }
}

/// How the scale was last chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Whole world visible.
    #[default]
    Fit,
    /// Fixed 3x zoom.
    X3,
    /// Anything reached by wheel or pinch.
    Free,
}

/// Result of [`ViewState::apply_view_mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeOutcome {
    /// The re-fit was suppressed because move mode is on.
    pub blocked: bool,
}

/// Pan/zoom state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub fit_scale: f64,
    pub mode: ViewMode,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scale: INITIAL_SCALE,
            tx: 0.0,
            ty: 0.0,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            fit_scale: 1.0,
            mode: ViewMode::Fit,
        }
    }
}

impl ViewState {
    /// Invert the transform. `origin` is the canvas offset within the page.
    #[must_use]
    pub fn screen_to_content(&self, screen: Point, origin: Point) -> Point {
        Point {
            x: (screen.x - origin.x - self.tx) / self.scale,
            y: (screen.y - origin.y - self.ty) / self.scale,
        }
    }

    /// Canvas-relative screen position of a content point.
    #[must_use]
    pub fn content_to_screen(&self, content: Point) -> Point {
        Point {
            x: content.x * self.scale + self.tx,
            y: content.y * self.scale + self.ty,
        }
    }

    /// The part of content space currently on screen.
    #[must_use]
    pub fn visible_content(&self, canvas: CanvasSize) -> Rect {
        let left = -self.tx / self.scale;
        let top = -self.ty / self.scale;
        Rect::new(left, top, left + canvas.width / self.scale, top + canvas.height / self.scale)
    }

    /// Fit, zoom to 3x, or re-center at the current scale.
    ///
    /// With `move_mode` on, nothing is re-fitted; pan is only clamped with
    /// the wider blocked margin. A world without area only records the mode.
    pub fn apply_view_mode(&mut self, world: Rect, canvas: CanvasSize, mode: ViewMode, move_mode: bool) -> ModeOutcome {
        if move_mode {
            self.clamp_pan(canvas, world, BLOCKED_PAN_MARGIN_PX);
            return ModeOutcome { blocked: true };
        }
        if !world.has_area() {
            self.mode = mode;
            return ModeOutcome { blocked: false };
        }

        let avail_w = (canvas.width - FIT_MARGIN_PX * 2.0).max(1.0);
        let avail_h = (canvas.height - FIT_MARGIN_PX * 2.0).max(1.0);
        self.fit_scale = (avail_w / world.width()).min(avail_h / world.height());

        match mode {
            ViewMode::Fit => self.scale = clamp(self.fit_scale, self.min_scale, self.max_scale),
            ViewMode::X3 => self.scale = clamp(X3_SCALE, self.min_scale, self.max_scale),
            ViewMode::Free => {}
        }

        self.tx = (canvas.width - world.width() * self.scale) * 0.5 - world.left * self.scale;
        self.ty = (canvas.height - world.height() * self.scale) * 0.5 - world.top * self.scale;
        self.clamp_pan(canvas, world, FIT_MARGIN_PX);
        self.mode = mode;
        ModeOutcome { blocked: false }
    }

    /// Multiply the scale by `factor`, keeping the content point under
    /// `focus` (canvas-relative) fixed on screen.
    ///
    /// Returns the new mode when it changed.
    pub fn zoom_at_screen(&mut self, canvas: CanvasSize, focus: Point, factor: f64, world: Rect) -> Option<ViewMode> {
        if !factor.is_finite() || factor <= 0.0 {
            return None;
        }
        let before = self.screen_to_content(focus, Point::default());
        let lower = self.min_scale.max(self.fit_scale * ZOOM_OUT_BELOW_FIT).min(self.max_scale);
        self.scale = clamp(self.scale * factor, lower, self.max_scale);
        self.tx = focus.x - before.x * self.scale;
        self.ty = focus.y - before.y * self.scale;
        self.clamp_pan(canvas, world, FIT_MARGIN_PX);

        let next = if (self.scale - X3_SCALE).abs() < X3_TOLERANCE { ViewMode::X3 } else { ViewMode::Free };
        if next == self.mode {
            return None;
        }
        self.mode = next;
        Some(next)
    }

    /// Keep the world on screen.
    ///
    /// On an axis where the scaled world covers the canvas, pan stops
    /// `margin` pixels past either edge. Otherwise that axis is centered.
    pub fn clamp_pan(&mut self, canvas: CanvasSize, world: Rect, margin: f64) {
        if !world.has_area() {
            return;
        }
        let s = self.scale;

        let min_tx = canvas.width - world.right * s - margin;
        let max_tx = -world.left * s + margin;
        if world.width() * s >= canvas.width {
            self.tx = clamp(self.tx, min_tx, max_tx);
        } else {
            self.tx = (canvas.width - world.width() * s) * 0.5 - world.left * s;
        }

        let min_ty = canvas.height - world.bottom * s - margin;
        let max_ty = -world.top * s + margin;
        if world.height() * s >= canvas.height {
            self.ty = clamp(self.ty, min_ty, max_ty);
        } else {
            self.ty = (canvas.height - world.height() * s) * 0.5 - world.top * s;
        }
    }
}
