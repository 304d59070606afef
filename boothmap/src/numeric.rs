//! Lenient number parsing and the sales/cost-rate color ramps.
//!
//! Spreadsheet exports mix ASCII and full-width digits, thousands separators
//! and currency marks. [`parse_loose`] keeps only what forms a number and
//! reports everything else as absent (`None`), which downstream code treats as
//! "exclude from aggregates, render as unknown".

#[cfg(test)]
#[path = "numeric_test.rs"]
mod numeric_test;

use crate::consts::{
    RATE_CEILING, RATE_HIGH, RATE_LOW, RATE_MID, RATE_PIVOT, RATE_UNKNOWN, SALES_HIGH, SALES_LOW, SALES_NEUTRAL,
};

// =============================================================
// Numbers
// =============================================================

/// Parse a number out of free-form text.
///
/// Full-width digits, dot and minus are folded to ASCII. A minus is kept only
/// as the first character, a dot only once and only after a sign or digit.
/// Everything else is skipped, so `"¥12,000"` parses as `12000`.
#[must_use]
pub fn parse_loose(raw: &str) -> Option<f64> {
    let mut out = String::with_capacity(raw.len());
    let mut seen_dot = false;
    for ch in raw.chars() {
        let ch = match ch {
            '\u{FF10}'..='\u{FF19}' => char::from_u32(u32::from(ch) - 0xFF10 + u32::from('0')).unwrap_or(ch),
            '\u{FF0E}' => '.',
            '\u{FF0D}' => '-',
            other => other,
        };
        match ch {
            '0'..='9' => out.push(ch),
            '.' if !seen_dot && !out.is_empty() => {
                seen_dot = true;
                out.push('.');
            }
            '-' if out.is_empty() => out.push('-'),
            _ => {}
        }
    }
    if matches!(out.as_str(), "" | "-" | "." | "-.") {
        return None;
    }
    match out.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => None,
    }
}

/// Numeric view of a JSON cell: finite numbers as-is, strings via [`parse_loose`].
#[must_use]
pub fn value_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        serde_json::Value::String(s) => parse_loose(s),
        _ => None,
    }
}

/// Clamp without panicking on an inverted range; the lower bound wins.
#[must_use]
pub fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    lo.max(hi.min(v))
}

// =============================================================
// Colors
// =============================================================

/// An sRGB color with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    /// Fully transparent black, the midpoint of the sales ramp.
    pub const TRANSPARENT: Self = Self { r: 0, g: 0, b: 0, a: 0.0 };

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Same color with a different alpha.
    #[must_use]
    pub fn with_alpha(self, a: f64) -> Self {
        Self { a: clamp(a, 0.0, 1.0), ..self }
    }

    /// Linear blend of all four channels; `t` is clamped to `[0, 1]`.
    #[must_use]
    pub fn lerp(self, to: Self, t: f64) -> Self {
        let t = clamp(t, 0.0, 1.0);
        Self {
            r: lerp_channel(self.r, to.r, t),
            g: lerp_channel(self.g, to.g, t),
            b: lerp_channel(self.b, to.b, t),
            a: self.a + (to.a - self.a) * t,
        }
    }

    /// CSS color string: `rgb(..)` when opaque, `rgba(..)` otherwise.
    #[must_use]
    pub fn css(self) -> String {
        if self.a >= 1.0 {
            format!("rgb({},{},{})", self.r, self.g, self.b)
        } else {
            format!("rgba({},{},{},{:.3})", self.r, self.g, self.b, self.a.max(0.0))
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lerp_channel(from: u8, to: u8, t: f64) -> u8 {
    let v = f64::from(from) + (f64::from(to) - f64::from(from)) * t;
    clamp(v.round(), 0.0, 255.0) as u8
}

/// Stroke color for a cost rate: blue to white up to the pivot, then white
/// to red until the ceiling. Unknown rates get a neutral grey.
#[must_use]
pub fn stroke_from_rate(rate: Option<f64>) -> Rgba {
    let Some(rate) = rate.filter(|r| r.is_finite()) else {
        return RATE_UNKNOWN;
    };
    if rate <= RATE_PIVOT {
        RATE_LOW.lerp(RATE_MID, rate / RATE_PIVOT)
    } else {
        RATE_MID.lerp(RATE_HIGH, (rate - RATE_PIVOT) / (RATE_CEILING - RATE_PIVOT))
    }
}

/// Fill color for a sales figure within `[min, max]`.
///
/// The low half fades blue into transparent, the high half transparent into
/// red, so mid-range booths stay see-through.
#[must_use]
pub fn fill_from_sales(sales: Option<f64>, min: f64, max: f64) -> Rgba {
    let Some(s) = sales.filter(|s| s.is_finite() && *s > 0.0) else {
        return SALES_NEUTRAL;
    };
    if max.is_nan() || min.is_nan() || max <= min {
        return SALES_NEUTRAL;
    }
    let t = clamp((s - min) / (max - min), 0.0, 1.0);
    if t < 0.5 {
        SALES_LOW.lerp(Rgba::TRANSPARENT, t / 0.5)
    } else {
        Rgba::TRANSPARENT.lerp(SALES_HIGH, (t - 0.5) / 0.5)
    }
}
