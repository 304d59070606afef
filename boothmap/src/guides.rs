//! Smart guides shown while dragging groups.
//!
//! The first moving rectangle is compared against nearby groups. The single
//! closest vertical alignment (left/center/right) and the single closest
//! horizontal alignment (top/middle/bottom) become guide lines; a guide
//! within tolerance is flagged `snapped`. Snapping is an indicator only and
//! never moves the drag. The smallest small gap on each axis is annotated.

#[cfg(test)]
#[path = "guides_test.rs"]
mod guides_test;

use serde::Serialize;

use crate::booth::Label;
use crate::camera::Rect;
use crate::consts::{GAP_EPSILON_FACTOR, GUIDE_COLOR, GUIDE_CULL_PX, GUIDE_EPSILON_PX, GUIDE_PAD_PX, GUIDE_SNAPPED_COLOR};
use crate::hit::GroupBounds;
use crate::layout::Bounds;

/// A guide or gap annotation in content space.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum GuideLine {
    Vertical { x: f64, y0: f64, y1: f64, snapped: bool },
    Horizontal { y: f64, x0: f64, x1: f64, snapped: bool },
    /// Horizontal gap between two groups, measured along `y`.
    GapH { x0: f64, x1: f64, y: f64, gap: f64 },
    /// Vertical gap between two groups, measured along `x`.
    GapV { y0: f64, y1: f64, x: f64, gap: f64 },
}

impl GuideLine {
    /// Stroke color for alignment lines; gap annotations use the default.
    #[must_use]
    pub fn color(&self) -> &'static str {
        match self {
            Self::Vertical { snapped: true, .. } | Self::Horizontal { snapped: true, .. } => GUIDE_SNAPPED_COLOR,
            _ => GUIDE_COLOR,
        }
    }

    /// Text for gap annotations, e.g. `"12px"`.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        match self {
            Self::GapH { gap, .. } | Self::GapV { gap, .. } => Some(format!("{}px", gap.round())),
            _ => None,
        }
    }
}

/// Content-space tolerances derived from screen pixels at the current scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuideTolerance {
    pub epsilon: f64,
    pub pad: f64,
    pub cull: f64,
}

impl GuideTolerance {
    /// Zooming out never widens the tolerances past their 1x values.
    #[must_use]
    pub fn for_scale(scale: f64) -> Self {
        let s = scale.max(1.0);
        Self { epsilon: GUIDE_EPSILON_PX / s, pad: GUIDE_PAD_PX / s, cull: GUIDE_CULL_PX / s }
    }
}

struct Candidate {
    dist: f64,
    line: GuideLine,
}

/// Guides for `moving` against every other group near `viewport`.
#[must_use]
pub fn compute_guides(
    moving: &[(Label, Bounds)],
    others: &GroupBounds,
    viewport: Rect,
    tol: GuideTolerance,
) -> Vec<GuideLine> {
    let Some((_, m)) = moving.first() else {
        return Vec::new();
    };
    let near = Bounds::new(
        viewport.left - tol.cull,
        viewport.top - tol.cull,
        viewport.width() + tol.cull * 2.0,
        viewport.height() + tol.cull * 2.0,
    );

    let mut best_v: Option<Candidate> = None;
    let mut best_h: Option<Candidate> = None;
    let mut gap_h: Option<GuideLine> = None;
    let mut gap_v: Option<GuideLine> = None;
    let gap_limit = tol.epsilon * GAP_EPSILON_FACTOR;

    let (mx0, mx1, mxc) = (m.x, m.right(), m.center().x);
    let (my0, my1, myc) = (m.y, m.bottom(), m.center().y);

    for (label, g) in others {
        if moving.iter().any(|(l, _)| l == label) || !g.intersects(&near) {
            continue;
        }
        let (gx0, gx1, gxc) = (g.x, g.right(), g.center().x);
        let (gy0, gy1, gyc) = (g.y, g.bottom(), g.center().y);

        for (a, b) in [(mx0, gx0), (mxc, gxc), (mx1, gx1)] {
            let dist = (a - b).abs();
            if best_v.as_ref().is_none_or(|c| dist < c.dist) {
                let line = GuideLine::Vertical {
                    x: b,
                    y0: my0.max(gy0) - tol.pad,
                    y1: my1.min(gy1) + tol.pad,
                    snapped: dist <= tol.epsilon,
                };
                best_v = Some(Candidate { dist, line });
            }
        }
        for (a, b) in [(my0, gy0), (myc, gyc), (my1, gy1)] {
            let dist = (a - b).abs();
            if best_h.as_ref().is_none_or(|c| dist < c.dist) {
                let line = GuideLine::Horizontal {
                    y: b,
                    x0: mx0.max(gx0) - tol.pad,
                    x1: mx1.min(gx1) + tol.pad,
                    snapped: dist <= tol.epsilon,
                };
                best_h = Some(Candidate { dist, line });
            }
        }

        let y_overlap = !(my1 < gy0 || my0 > gy1);
        if y_overlap {
            let y = (my0.max(gy0) + my1.min(gy1)) * 0.5;
            let found = [(gx0 - mx1, mx1, gx0), (mx0 - gx1, gx1, mx0)];
            for (gap, x0, x1) in found {
                if gap > 0.0 && gap <= gap_limit && smaller_gap(gap_h.as_ref(), gap) {
                    gap_h = Some(GuideLine::GapH { x0, x1, y, gap });
                }
            }
        }
        let x_overlap = !(mx1 < gx0 || mx0 > gx1);
        if x_overlap {
            let x = (mx0.max(gx0) + mx1.min(gx1)) * 0.5;
            let found = [(gy0 - my1, my1, gy0), (my0 - gy1, gy1, my0)];
            for (gap, y0, y1) in found {
                if gap > 0.0 && gap <= gap_limit && smaller_gap(gap_v.as_ref(), gap) {
                    gap_v = Some(GuideLine::GapV { y0, y1, x, gap });
                }
            }
        }
    }

    [best_v.map(|c| c.line), best_h.map(|c| c.line), gap_h, gap_v].into_iter().flatten().collect()
}

fn smaller_gap(current: Option<&GuideLine>, gap: f64) -> bool {
    match current {
        Some(GuideLine::GapH { gap: g, .. } | GuideLine::GapV { gap: g, .. }) => gap < *g,
        _ => true,
    }
}
