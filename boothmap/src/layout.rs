//! Deterministic group layout.
//!
//! A group holds up to four booths. Two booths sit side by side; three or
//! four fill a 2x2 grid row-major. Groups themselves flow left-to-right in
//! rows of `cols`, each row as tall as its tallest group.

#[cfg(test)]
#[path = "layout_test.rs"]
mod layout_test;

use serde::Serialize;

use crate::booth::{Booth, Dataset, Label};
use crate::camera::{Point, Rect};
use crate::consts::{
    CELL_GAP, COLUMN_SAMPLE, DATA_SCALE, FALLBACK_GROUP_W, GRID_GAP_X, GRID_GAP_Y, GRID_START_X, GRID_START_Y,
    MAX_ITEMS_PER_GROUP, MIN_CELL_PX,
};

/// Axis-aligned box by origin and size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Bounds {
    #[must_use]
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Normalize two corners into a box.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(a.x.min(b.x), a.y.min(b.y), (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    /// Edge-inclusive containment.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Edge-inclusive overlap.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        !(other.right() < self.x || other.x > self.right() || other.bottom() < self.y || other.y > self.bottom())
    }

    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.w, self.h)
    }
}

/// Where the booths of one group go, relative to the group origin.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupLayout {
    pub group_w: f64,
    pub group_h: f64,
    pub placements: Vec<Bounds>,
    /// Booths actually placed (at most four).
    pub n: usize,
}

/// Split a group's footprint evenly between its booths.
///
/// The footprint comes from the first booth's width and depth. Without
/// both, the layout is empty. Booths past the fourth are not placed.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn layout_items_equal_split(items: &[Booth]) -> GroupLayout {
    let Some(first) = items.first() else {
        return GroupLayout::default();
    };
    let (Some(width), Some(depth)) = (first.width, first.depth) else {
        return GroupLayout::default();
    };

    let n = items.len().min(MAX_ITEMS_PER_GROUP);
    let (cols, rows) = match n {
        1 => (1, 1),
        2 => (2, 1),
        _ => (2, 2),
    };
    let cell_w = cell_px(width / cols as f64);
    let cell_h = cell_px(depth / rows as f64);
    let group_w = cols as f64 * cell_w + (cols - 1) as f64 * CELL_GAP;
    let group_h = rows as f64 * cell_h + (rows - 1) as f64 * CELL_GAP;

    let placements = (0..n)
        .map(|i| {
            let (c, r) = if n == 2 { (i, 0) } else { (i % 2, i / 2) };
            Bounds::new(c as f64 * (cell_w + CELL_GAP), r as f64 * (cell_h + CELL_GAP), cell_w, cell_h)
        })
        .collect();

    GroupLayout { group_w, group_h, placements, n }
}

fn cell_px(units: f64) -> f64 {
    (units * DATA_SCALE).round().max(MIN_CELL_PX)
}

/// Places group footprints on the grid, one call per label in draw order.
#[derive(Debug, Clone)]
pub struct GridWalker {
    cols: usize,
    col: usize,
    x: f64,
    y: f64,
    row_h: f64,
}

impl GridWalker {
    #[must_use]
    pub fn new(cols: usize) -> Self {
        Self { cols: cols.max(1), col: 0, x: GRID_START_X, y: GRID_START_Y, row_h: 0.0 }
    }

    /// Top-left of the next group of size `w` x `h`.
    pub fn place(&mut self, w: f64, h: f64) -> Point {
        if self.col >= self.cols {
            self.col = 0;
            self.x = GRID_START_X;
            self.y += self.row_h + GRID_GAP_Y;
            self.row_h = 0.0;
        }
        let at = Point::new(self.x, self.y);
        self.x += w + GRID_GAP_X;
        self.row_h = self.row_h.max(h);
        self.col += 1;
        at
    }
}

/// Bounding box of every group at its grid position (offsets ignored).
#[must_use]
pub fn measure_content_rect(labels: &[Label], dataset: &Dataset, cols: usize) -> Rect {
    let mut walker = GridWalker::new(cols);
    let mut right = GRID_START_X;
    let mut bottom = GRID_START_Y;
    for label in labels {
        let g = layout_items_equal_split(dataset.group(label));
        let at = walker.place(g.group_w, g.group_h);
        right = right.max(at.x + g.group_w);
        bottom = bottom.max(at.y + g.group_h);
    }
    Rect::new(GRID_START_X, GRID_START_Y, right, bottom)
}

/// Columns that fit in `canvas_width`, estimated from the first few groups.
/// Groups without dimensions count as zero width.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn choose_columns(dataset: &Dataset, canvas_width: f64) -> usize {
    let widths: Vec<f64> = dataset
        .labels()
        .iter()
        .take(COLUMN_SAMPLE)
        .map(|l| layout_items_equal_split(dataset.group(l)).group_w)
        .collect();
    let approx_w = if widths.is_empty() { FALLBACK_GROUP_W } else { widths.iter().sum::<f64>() / widths.len() as f64 };
    let avail_w = (canvas_width - GRID_START_X * 2.0).max(1.0);
    let cols = ((avail_w + GRID_GAP_X) / (approx_w + GRID_GAP_X)).floor();
    if cols.is_finite() && cols >= 1.0 { cols as usize } else { 1 }
}
