//! Hit-testing against the per-frame booth rectangles.
//!
//! Rectangles are stored unrotated. A rotated group is resolved in two
//! passes: find the label under the raw point, then undo that group's
//! rotation around its center and look again.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::booth::Label;
use crate::camera::Point;
use crate::layout::Bounds;

/// Unrotated footprint of every group, keyed by label.
pub type GroupBounds = BTreeMap<Label, Bounds>;

/// Geometry and data of one drawn booth cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HitRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub label: Label,
    pub booth_id: String,
    pub prize: String,
    pub machine: String,
    pub sales: Option<f64>,
    pub count: Option<f64>,
    pub cost: Option<f64>,
    pub rate: Option<f64>,
}

impl HitRect {
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.w, self.h)
    }
}

/// Topmost rectangle containing `p`, edges included.
#[must_use]
pub fn rect_hit_at_content(rects: &[HitRect], p: Point) -> Option<&HitRect> {
    rects.iter().rev().find(|r| r.bounds().contains(p))
}

/// Rotation-aware hit: prefer the cell under the unrotated point when it
/// stays within the same label; otherwise keep the first result.
#[must_use]
pub fn resolve_hit<'a>(
    rects: &'a [HitRect],
    bounds: &GroupBounds,
    rotation_of: impl Fn(&str) -> f64,
    p: Point,
) -> Option<&'a HitRect> {
    let first = rect_hit_at_content(rects, p)?;
    let deg = rotation_of(&first.label);
    if deg.abs() < f64::EPSILON {
        return Some(first);
    }
    let Some(group) = bounds.get(&first.label) else {
        return Some(first);
    };
    let local = rotate_about(p, group.center(), -deg);
    match rect_hit_at_content(rects, local) {
        Some(second) if second.label == first.label => Some(second),
        _ => Some(first),
    }
}

/// Rotate `p` by `deg` degrees about `center` (clockwise on a y-down canvas).
#[must_use]
pub fn rotate_about(p: Point, center: Point, deg: f64) -> Point {
    let (sin, cos) = deg.to_radians().sin_cos();
    let dx = p.x - center.x;
    let dy = p.y - center.y;
    Point::new(center.x + dx * cos - dy * sin, center.y + dx * sin + dy * cos)
}

/// Map any angle into `[0, 360)`.
#[must_use]
pub fn normalize_degrees(deg: f64) -> f64 {
    if !deg.is_finite() {
        return 0.0;
    }
    let d = deg.rem_euclid(360.0);
    if d >= 360.0 { 0.0 } else { d }
}

/// Labels whose bounds touch `area`, in label order.
#[must_use]
pub fn labels_in_rect(bounds: &GroupBounds, area: Bounds) -> Vec<Label> {
    bounds
        .iter()
        .filter(|(_, b)| b.intersects(&area))
        .map(|(label, _)| label.clone())
        .collect()
}
