//! Rendering: draws a laid-out [`Frame`] to a 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! Every color, alpha and mark has already been decided by
//! [`crate::scene::build_frame`]; this module only turns it into pixels.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use crate::camera::{CanvasSize, ViewState};
use crate::guides::GuideLine;
use crate::layout::Bounds;
use crate::numeric::Rgba;
use crate::options::ViewOptions;
use crate::scene::{CellDraw, CellPaint, Fill, Frame, GroupDraw};

/// Corner radius as a fraction of the shorter cell side.
const CORNER_RATIO: f64 = 0.12;
/// Ring band width as a fraction of the gradient radius.
const RING_WIDTH: f64 = 0.12;
const RING_STRONG_ALPHA: f64 = 0.9;
const RING_STOP_EPSILON: f64 = 1e-6;

const BASE_STROKE: &str = "rgba(255,255,255,0.35)";
const OUTLINE_STROKE: &str = "rgba(255,255,255,0.6)";
const MARK_OUTLINE: &str = "rgba(0,0,0,0.55)";
const SELECT_STROKE: &str = "rgba(0,180,255,0.9)";
const SELECT_FILL: &str = "rgba(0,180,255,0.15)";
const SELECTED_STROKE: &str = "rgba(0,180,255,0.95)";

const ACTIVE_DASH_PX: f64 = 6.0;
const ACTIVE_LINE_PX: f64 = 3.0;
const SELECT_DASH_PX: f64 = 6.0;
const SELECT_GAP_PX: f64 = 4.0;
const ARROW_PX: f64 = 6.0;

/// Everything one draw reads.
pub struct Scene<'a> {
    pub frame: &'a Frame,
    pub view: &'a ViewState,
    pub canvas: CanvasSize,
    pub options: &'a ViewOptions,
    pub guides: &'a [GuideLine],
    pub select_rect: Option<Bounds>,
    pub background: Option<&'a HtmlImageElement>,
    pub dpr: f64,
}

/// Draw the full scene: background, veil, groups, selection UI and guides.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(ctx: &CanvasRenderingContext2d, scene: &Scene<'_>) -> Result<(), JsValue> {
    let view = scene.view;

    // Layer 1: clear and set up transforms.
    ctx.set_transform(scene.dpr, 0.0, 0.0, scene.dpr, 0.0, 0.0)?;
    ctx.clear_rect(0.0, 0.0, scene.canvas.width, scene.canvas.height);
    ctx.save();
    ctx.translate(view.tx, view.ty)?;
    ctx.scale(view.scale, view.scale)?;

    // Layer 2: background image and veil.
    if let Some(img) = scene.background {
        let (w, h) = (f64::from(img.natural_width()), f64::from(img.natural_height()));
        if w > 0.0 && h > 0.0 {
            ctx.draw_image_with_html_image_element_and_dw_and_dh(img, 0.0, 0.0, w, h)?;
        }
    }
    draw_veil(ctx, scene);

    // Layer 3: groups in layout order.
    for group in &scene.frame.groups {
        draw_group(ctx, group, view.scale, scene.options.show_label)?;
    }

    // Layer 4: selection UI.
    draw_selected(ctx, scene.frame, view.scale)?;
    if let Some(r) = scene.select_rect {
        draw_select_rect(ctx, r, view.scale)?;
    }

    // Layer 5: smart guides.
    for guide in scene.guides {
        draw_guide(ctx, guide, view.scale)?;
    }

    ctx.restore();
    Ok(())
}

/// Darken the visible area; opacity 1 means no veil.
fn draw_veil(ctx: &CanvasRenderingContext2d, scene: &Scene<'_>) {
    let a = 1.0 - scene.options.bg_opacity;
    if a <= 0.0 {
        return;
    }
    let visible = scene.view.visible_content(scene.canvas);
    ctx.set_fill_style_str(&Rgba::rgb(0, 0, 0).with_alpha(a).css());
    ctx.fill_rect(visible.left, visible.top, visible.width(), visible.height());
}

// =============================================================
// Groups and cells
// =============================================================

fn draw_group(ctx: &CanvasRenderingContext2d, group: &GroupDraw, scale: f64, show_label: bool) -> Result<(), JsValue> {
    let b = group.bounds;
    ctx.save();
    if group.rotation.abs() > f64::EPSILON {
        let c = b.center();
        ctx.translate(c.x, c.y)?;
        ctx.rotate(group.rotation.to_radians())?;
        ctx.translate(-c.x, -c.y)?;
    }

    let n = group.cells.len();
    for cell in &group.cells {
        draw_cell(ctx, cell, scale)?;
        if let Some(mark) = &cell.mark {
            draw_mark(ctx, mark, cell.bounds, n, scale)?;
        }
    }

    if group.active {
        set_dash(ctx, &[ACTIVE_DASH_PX / scale, ACTIVE_DASH_PX / scale])?;
        ctx.set_line_width(ACTIVE_LINE_PX / scale);
        ctx.set_stroke_style_str("#fff");
        ctx.stroke_rect(b.x, b.y, b.w, b.h);
        set_dash(ctx, &[])?;
    }
    ctx.restore();

    // Labels stay horizontal.
    if show_label {
        draw_label(ctx, group)?;
    }
    Ok(())
}

fn draw_cell(ctx: &CanvasRenderingContext2d, cell: &CellDraw, scale: f64) -> Result<(), JsValue> {
    let b = cell.bounds;
    ctx.save();
    match cell.paint {
        CellPaint::Dimmed { alpha } => {
            path_round_rect(ctx, b);
            ctx.set_fill_style_str(&Rgba::rgb(0, 0, 0).with_alpha(alpha).css());
            ctx.fill();
        }
        CellPaint::Outline => {
            path_round_rect(ctx, b);
            ctx.set_stroke_style_str(OUTLINE_STROKE);
            ctx.set_line_width(1.0 / scale);
            ctx.stroke();
        }
        CellPaint::Styled { fill, stroke } => {
            match fill {
                Fill::None => {}
                Fill::Solid(color) => {
                    path_round_rect(ctx, b);
                    ctx.set_fill_style_str(&color.css());
                    ctx.fill();
                }
                Fill::Ring { color, phase } => {
                    path_round_rect(ctx, b);
                    fill_ring(ctx, b, color, phase)?;
                }
            }

            path_round_rect(ctx, b);
            ctx.set_stroke_style_str(BASE_STROKE);
            ctx.set_line_width(1.0 / scale);
            ctx.stroke();

            if let Some(s) = stroke {
                path_round_rect(ctx, b);
                ctx.set_global_alpha(ctx.global_alpha() * s.alpha);
                ctx.set_stroke_style_str(&s.color.css());
                ctx.set_line_width(s.width_px / scale);
                ctx.set_line_join("round");
                ctx.stroke();
            }
        }
    }
    ctx.restore();
    Ok(())
}

/// Radial gradient with a bright band at `phase` of the way out.
fn fill_ring(ctx: &CanvasRenderingContext2d, b: Bounds, color: Rgba, phase: f64) -> Result<(), JsValue> {
    let c = b.center();
    let r_max = (b.w.max(b.h) * 0.9).max(1.0);
    let gradient = ctx.create_radial_gradient(c.x, c.y, 0.0, c.x, c.y, r_max)?;

    let top = 1.0 - RING_STOP_EPSILON;
    let unit = |v: f64| v.clamp(0.0, top);
    let s1 = unit(phase - RING_WIDTH);
    let s2 = unit(phase).max((s1 + RING_STOP_EPSILON).min(top));
    let s3 = unit(phase + RING_WIDTH * 0.6).max((s2 + RING_STOP_EPSILON).min(top));

    let fade = color.with_alpha(0.0).css();
    let strong = color.with_alpha(RING_STRONG_ALPHA).css();
    for (offset, css) in [(0.0, &fade), (s1, &fade), (s2, &strong), (s3, &fade), (top, &fade)] {
        #[allow(clippy::cast_possible_truncation)]
        let offset = offset as f32;
        gradient.add_color_stop(offset, css)?;
    }
    ctx.set_fill_style_canvas_gradient(&gradient);
    ctx.fill();
    Ok(())
}

/// Rounded-rectangle path; the caller fills or strokes it.
fn path_round_rect(ctx: &CanvasRenderingContext2d, b: Bounds) {
    let r = (b.w.min(b.h) * CORNER_RATIO).clamp(0.0, b.w.min(b.h) / 2.0);
    let (x, y, w, h) = (b.x, b.y, b.w, b.h);
    ctx.begin_path();
    ctx.move_to(x + r, y);
    ctx.line_to(x + w - r, y);
    ctx.quadratic_curve_to(x + w, y, x + w, y + r);
    ctx.line_to(x + w, y + h - r);
    ctx.quadratic_curve_to(x + w, y + h, x + w - r, y + h);
    ctx.line_to(x + r, y + h);
    ctx.quadratic_curve_to(x, y + h, x, y + h - r);
    ctx.line_to(x, y + r);
    ctx.quadratic_curve_to(x, y, x + r, y);
}

/// Move-mode position mark, sized to fit inside the cell.
fn draw_mark(ctx: &CanvasRenderingContext2d, mark: &str, b: Bounds, n: usize, scale: f64) -> Result<(), JsValue> {
    let k = if n == 4 { 0.35 } else { 0.40 };
    let mut fs = (b.w.min(b.h) * k).floor().max(4.0);
    ctx.save();
    ctx.set_font(&font_px(fs));
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");

    let max_w = b.w * 0.7;
    let measured = ctx.measure_text(mark)?.width();
    if measured > max_w {
        fs = (fs * (max_w / (measured + 1.0))).floor().max(5.0);
    }
    fs = fs.min((b.h * 0.75).floor());
    ctx.set_font(&font_px(fs));

    let c = b.center();
    ctx.set_stroke_style_str(MARK_OUTLINE);
    ctx.set_line_width((fs * 0.12).round().max(0.5) / scale);
    ctx.set_fill_style_str("#fff");
    ctx.stroke_text(mark, c.x, c.y)?;
    ctx.fill_text(mark, c.x, c.y)?;
    ctx.restore();
    Ok(())
}

fn draw_label(ctx: &CanvasRenderingContext2d, group: &GroupDraw) -> Result<(), JsValue> {
    let b = group.bounds;
    let fs = (b.w.min(b.h) * 0.08).floor().clamp(8.0, 14.0);
    ctx.set_font(&font_px(fs));
    ctx.set_fill_style_str("#fff");
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    let c = b.center();
    let line_h = fs * 1.2;
    match group.label_lines.as_slice() {
        [one] => ctx.fill_text(one, c.x, c.y)?,
        [first, second, ..] => {
            ctx.fill_text(first, c.x, c.y - line_h / 2.0)?;
            ctx.fill_text(second, c.x, c.y + line_h / 2.0)?;
        }
        [] => {}
    }
    Ok(())
}

// =============================================================
// Selection UI
// =============================================================

fn draw_selected(ctx: &CanvasRenderingContext2d, frame: &Frame, scale: f64) -> Result<(), JsValue> {
    let s = scale.max(1.0);
    let selected: Vec<&GroupDraw> = frame.groups.iter().filter(|g| g.selected).collect();
    if selected.is_empty() {
        return Ok(());
    }
    ctx.save();
    ctx.set_stroke_style_str(SELECTED_STROKE);
    ctx.set_line_width(2.0 / s);
    set_dash(ctx, &[SELECT_DASH_PX / s, SELECT_GAP_PX / s])?;
    for group in selected {
        for cell in &group.cells {
            let b = cell.bounds;
            ctx.stroke_rect(b.x, b.y, b.w, b.h);
        }
    }
    ctx.restore();
    Ok(())
}

fn draw_select_rect(ctx: &CanvasRenderingContext2d, r: Bounds, scale: f64) -> Result<(), JsValue> {
    let s = scale.max(1.0);
    ctx.save();
    ctx.set_stroke_style_str(SELECT_STROKE);
    ctx.set_fill_style_str(SELECT_FILL);
    ctx.set_line_width(1.0 / s);
    set_dash(ctx, &[SELECT_DASH_PX / s, SELECT_GAP_PX / s])?;
    ctx.stroke_rect(r.x, r.y, r.w, r.h);
    ctx.fill_rect(r.x, r.y, r.w, r.h);
    ctx.restore();
    Ok(())
}

// =============================================================
// Guides
// =============================================================

fn draw_guide(ctx: &CanvasRenderingContext2d, guide: &GuideLine, scale: f64) -> Result<(), JsValue> {
    let s = scale.max(1.0);
    let color = guide.color();
    ctx.save();
    ctx.set_stroke_style_str(color);
    ctx.set_fill_style_str(color);
    ctx.set_line_width(1.0 / s);
    let a = ARROW_PX / s;
    match *guide {
        GuideLine::Vertical { x, y0, y1, .. } => segment(ctx, (x, y0), (x, y1)),
        GuideLine::Horizontal { y, x0, x1, .. } => segment(ctx, (x0, y), (x1, y)),
        GuideLine::GapH { x0, x1, y, .. } => {
            segment(ctx, (x0, y), (x1, y));
            triangle(ctx, (x0, y), (x0 + a, y - a / 2.0), (x0 + a, y + a / 2.0));
            triangle(ctx, (x1, y), (x1 - a, y - a / 2.0), (x1 - a, y + a / 2.0));
            gap_text(ctx, guide, s, ((x0 + x1) / 2.0, y - 2.0 / s), "center", "bottom")?;
        }
        GuideLine::GapV { y0, y1, x, .. } => {
            segment(ctx, (x, y0), (x, y1));
            triangle(ctx, (x, y0), (x - a / 2.0, y0 + a), (x + a / 2.0, y0 + a));
            triangle(ctx, (x, y1), (x - a / 2.0, y1 - a), (x + a / 2.0, y1 - a));
            gap_text(ctx, guide, s, (x + 2.0 / s, (y0 + y1) / 2.0), "left", "middle")?;
        }
    }
    ctx.restore();
    Ok(())
}

fn segment(ctx: &CanvasRenderingContext2d, from: (f64, f64), to: (f64, f64)) {
    ctx.begin_path();
    ctx.move_to(from.0, from.1);
    ctx.line_to(to.0, to.1);
    ctx.stroke();
}

fn triangle(ctx: &CanvasRenderingContext2d, a: (f64, f64), b: (f64, f64), c: (f64, f64)) {
    ctx.begin_path();
    ctx.move_to(a.0, a.1);
    ctx.line_to(b.0, b.1);
    ctx.line_to(c.0, c.1);
    ctx.close_path();
    ctx.fill();
}

fn gap_text(
    ctx: &CanvasRenderingContext2d,
    guide: &GuideLine,
    s: f64,
    at: (f64, f64),
    align: &str,
    baseline: &str,
) -> Result<(), JsValue> {
    let Some(text) = guide.label() else {
        return Ok(());
    };
    ctx.set_fill_style_str("#fff");
    ctx.set_font(&font_px((12.0 / s).floor().max(10.0)));
    ctx.set_text_align(align);
    ctx.set_text_baseline(baseline);
    ctx.fill_text(&text, at.0, at.1)
}

// =============================================================
// Helpers
// =============================================================

fn set_dash(ctx: &CanvasRenderingContext2d, segments: &[f64]) -> Result<(), JsValue> {
    let dash = js_sys::Array::new();
    for seg in segments {
        dash.push(&(*seg).into());
    }
    ctx.set_line_dash(&dash)
}

fn font_px(px: f64) -> String {
    format!("{px}px sans-serif")
}
