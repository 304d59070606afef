//! Layout pass: turns the dataset and view settings into one drawable frame.
//!
//! [`build_frame`] is pure data. It places every group, records the group
//! bounds and hit rectangles other components read until the next pass,
//! classifies each booth, and decides how each cell is painted. The canvas
//! code in `render` only replays the result.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::booth::{Booth, Dataset, Label, MachineFilter};
use crate::camera::{Point, Rect};
use crate::classify::{Classification, ScopeStats, classify};
use crate::consts::{
    PLAIN_STROKE_PX, PULSE_RATE, RATE_STROKE_PX, RING_ID_MODULUS, RING_RATE, SHADE_PULSE_BASE, SHADE_PULSE_SPAN,
    STROKE_PULSE_BASE, STROKE_PULSE_SPAN,
};
use crate::hit::{GroupBounds, HitRect};
use crate::layout::{Bounds, GridWalker, layout_items_equal_split, measure_content_rect};
use crate::numeric::{Rgba, clamp, fill_from_sales, stroke_from_rate};
use crate::options::ViewOptions;
use crate::persist::{OffsetMap, RotationMap};

/// Labels longer than this are split in half when they have no spaces.
const LABEL_SPLIT_CHARS: usize = 8;

/// Background raster size; the image sits at the content origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Background {
    pub width: f64,
    pub height: f64,
}

impl Background {
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// Keep a `w` x `h` group inside the image.
    #[must_use]
    pub fn clamp_origin(&self, p: Point, w: f64, h: f64) -> Point {
        if self.width <= 0.0 || self.height <= 0.0 {
            return p;
        }
        Point::new(clamp(p.x, 0.0, (self.width - w).max(0.0)), clamp(p.y, 0.0, (self.height - h).max(0.0)))
    }
}

/// Union of the background and the content. Without a background it is
/// the content alone.
#[must_use]
pub fn world_rect(content: Rect, background: Option<Background>) -> Rect {
    match background {
        Some(bg) if bg.rect().has_area() => bg.rect().union(&content),
        _ => content,
    }
}

/// Everything the layout pass reads.
#[derive(Debug, Clone, Copy)]
pub struct SceneInput<'a> {
    pub dataset: &'a Dataset,
    pub options: &'a ViewOptions,
    pub offsets: &'a OffsetMap,
    pub rotations: &'a RotationMap,
    pub filter: &'a MachineFilter,
    pub background: Option<Background>,
    pub cols: usize,
    pub move_mode: bool,
    pub active_label: Option<&'a str>,
    pub selected: &'a BTreeSet<Label>,
}

/// Cell fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill {
    None,
    Solid(Rgba),
    /// A ring of `color` sweeping outward; `phase` in `[0, 1)`.
    Ring { color: Rgba, phase: f64 },
}

/// Rate-colored cell border. `width_px` is in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Rgba,
    pub width_px: f64,
    pub alpha: f64,
}

/// How one cell is painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellPaint {
    /// Outside the machine filter: a dark shade only.
    Dimmed { alpha: f64 },
    /// Fill and stroke both off: a faint outline only.
    Outline,
    Styled { fill: Fill, stroke: Option<Stroke> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellDraw {
    /// Absolute, unrotated content-space rectangle.
    pub bounds: Bounds,
    pub paint: CellPaint,
    /// Move-mode position mark.
    pub mark: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupDraw {
    pub label: Label,
    pub bounds: Bounds,
    pub rotation: f64,
    pub cells: Vec<CellDraw>,
    pub active: bool,
    pub selected: bool,
    pub label_lines: Vec<String>,
}

/// Per-booth record published for external tooling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoothDebug {
    pub id: String,
    pub machine: String,
    pub rate: Option<f64>,
    pub highlighted: bool,
    pub blink: bool,
}

/// Which booths are highlighted and blinking in this frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameReport {
    pub highlighted_ids: Vec<String>,
    pub blinking_ids: Vec<String>,
    pub booths: Vec<BoothDebug>,
}

/// Output of one layout pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub hit_rects: Vec<HitRect>,
    pub group_bounds: GroupBounds,
    pub groups: Vec<GroupDraw>,
    pub content_rect: Rect,
    pub world_rect: Rect,
    pub report: FrameReport,
}

/// Lay out, classify and paint every group.
#[must_use]
pub fn build_frame(input: &SceneInput<'_>, now_ms: f64) -> Frame {
    let dataset = input.dataset;
    let scope = ScopeStats::compute(dataset.booths(), input.filter);
    let color_bounds = scope.color_bounds(dataset.sales_bounds());
    let content_rect = measure_content_rect(dataset.labels(), dataset, input.cols);
    let mut frame = Frame {
        content_rect,
        world_rect: world_rect(content_rect, input.background),
        ..Frame::default()
    };

    let mut walker = GridWalker::new(input.cols);
    for label in dataset.labels() {
        let items = dataset.group(label);
        let layout = layout_items_equal_split(items);
        let grid = walker.place(layout.group_w, layout.group_h);
        if layout.n == 0 {
            continue;
        }

        let offset = input.offsets.get(label).copied().unwrap_or_default();
        let mut origin = Point::new(grid.x + offset.dx, grid.y + offset.dy);
        if let Some(bg) = input.background {
            origin = bg.clamp_origin(origin, layout.group_w, layout.group_h);
        }
        let bounds = Bounds::new(origin.x, origin.y, layout.group_w, layout.group_h);
        frame.group_bounds.insert(label.clone(), bounds);

        let mut cells = Vec::with_capacity(layout.n);
        for (i, (booth, place)) in items.iter().zip(&layout.placements).enumerate() {
            let cell = place.translated(origin.x, origin.y);
            let class = classify(booth, &input.options.highlight, &scope);
            let admitted = input.filter.admits(booth);
            if admitted && !booth.booth_id.is_empty() {
                record(&mut frame.report, booth, class);
            }
            frame.hit_rects.push(hit_rect(booth, cell));
            cells.push(CellDraw {
                bounds: cell,
                paint: paint(booth, class, admitted, input.options, color_bounds, now_ms),
                mark: input.move_mode.then(|| cell_mark(i, layout.n, &cell, &bounds)),
            });
        }

        frame.groups.push(GroupDraw {
            label: label.clone(),
            bounds,
            rotation: input.rotations.get(label),
            cells,
            active: input.active_label == Some(label.as_str()),
            selected: input.selected.contains(label),
            label_lines: split_label(label),
        });
    }
    frame
}

fn record(report: &mut FrameReport, booth: &Booth, class: Classification) {
    if class.highlighted {
        report.highlighted_ids.push(booth.booth_id.clone());
    }
    if class.blink {
        report.blinking_ids.push(booth.booth_id.clone());
    }
    report.booths.push(BoothDebug {
        id: booth.booth_id.clone(),
        machine: booth.machine.clone(),
        rate: booth.rate,
        highlighted: class.highlighted,
        blink: class.blink,
    });
}

fn hit_rect(booth: &Booth, cell: Bounds) -> HitRect {
    HitRect {
        x: cell.x,
        y: cell.y,
        w: cell.w,
        h: cell.h,
        label: booth.label.clone(),
        booth_id: booth.booth_id.clone(),
        prize: booth.prize.clone(),
        machine: booth.machine.clone(),
        sales: booth.sales,
        count: booth.count,
        cost: booth.cost,
        rate: booth.rate,
    }
}

fn paint(
    booth: &Booth,
    class: Classification,
    admitted: bool,
    options: &ViewOptions,
    (min, max): (f64, f64),
    now_ms: f64,
) -> CellPaint {
    if !admitted {
        return CellPaint::Dimmed { alpha: options.dim_opacity };
    }
    if !options.fill_enabled && !options.stroke_enabled {
        return CellPaint::Outline;
    }

    let fill = if !options.fill_enabled {
        Fill::None
    } else if class.highlighted {
        let color = fill_from_sales(booth.sales, min, max);
        if class.blink { Fill::Ring { color, phase: ring_phase(&booth.booth_id, now_ms) } } else { Fill::Solid(color) }
    } else {
        let alpha = if class.blink {
            (options.dim_opacity * pulse(now_ms, SHADE_PULSE_BASE, SHADE_PULSE_SPAN)).min(1.0)
        } else {
            options.dim_opacity
        };
        Fill::Solid(Rgba::rgb(0, 0, 0).with_alpha(alpha))
    };

    let stroke = options.stroke_enabled.then(|| Stroke {
        color: stroke_from_rate(booth.rate),
        width_px: if booth.rate.is_some() { RATE_STROKE_PX } else { PLAIN_STROKE_PX },
        alpha: if class.blink { pulse(now_ms, STROKE_PULSE_BASE, STROKE_PULSE_SPAN) } else { 1.0 },
    });
    CellPaint::Styled { fill, stroke }
}

/// `base + span * |sin(t * rate)|`.
#[must_use]
pub fn pulse(now_ms: f64, base: f64, span: f64) -> f64 {
    base + span * (now_ms * PULSE_RATE).sin().abs()
}

/// Ring position for a blinking highlighted cell, offset per booth id.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ring_phase(id: &str, now_ms: f64) -> f64 {
    let offset = (id.chars().count() % RING_ID_MODULUS) as f64 / RING_ID_MODULUS as f64;
    (now_ms * RING_RATE + offset).rem_euclid(1.0)
}

/// `L`/`R` for two-cell groups, `1..n` otherwise.
fn cell_mark(i: usize, n: usize, cell: &Bounds, group: &Bounds) -> String {
    if n == 2 {
        let mark = if cell.center().x < group.center().x { "L" } else { "R" };
        return mark.to_owned();
    }
    (i + 1).to_string()
}

/// At most two display lines: split at the first whitespace run, or in
/// half when the label is long and has none.
#[must_use]
pub fn split_label(label: &str) -> Vec<String> {
    let mut parts = label.split_whitespace();
    let Some(first) = parts.next() else {
        return Vec::new();
    };
    let rest: Vec<&str> = parts.collect();
    if !rest.is_empty() {
        return vec![first.to_owned(), rest.join(" ")];
    }
    let chars: Vec<char> = first.chars().collect();
    if chars.len() > LABEL_SPLIT_CHARS {
        let mid = chars.len().div_ceil(2);
        return vec![chars[..mid].iter().collect(), chars[mid..].iter().collect()];
    }
    vec![first.to_owned()]
}
