//! Persisted view options.
//!
//! The current shape nests the classifier settings under `highlight`. Older
//! saves used a flat bag of `sales*`/`blink*`/`rateBlink*` keys; those are
//! folded into [`HighlightConfig`] on load. Every field falls back to its
//! default on its own, so one bad value never discards the rest.

#[cfg(test)]
#[path = "options_test.rs"]
mod options_test;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classify::{BlinkConfig, BlinkRule, Direction, HighlightConfig, HighlightMode, RankFrom};
use crate::consts::{
    DEFAULT_BG_OPACITY, DEFAULT_DIM_OPACITY, DEFAULT_QUANTILE, DEFAULT_RANK_COUNT, DEFAULT_RATE_AT_LEAST,
    DEFAULT_RATE_AT_MOST,
};
use crate::numeric::{clamp, value_number};

/// Schema version written with every save.
pub const OPTIONS_VERSION: u32 = 2;

/// Display and classification settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct ViewOptions {
    pub version: u32,
    pub bg_opacity: f64,
    pub dim_opacity: f64,
    pub show_label: bool,
    pub fill_enabled: bool,
    pub stroke_enabled: bool,
    pub highlight: HighlightConfig,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            version: OPTIONS_VERSION,
            bg_opacity: DEFAULT_BG_OPACITY,
            dim_opacity: DEFAULT_DIM_OPACITY,
            show_label: true,
            fill_enabled: true,
            stroke_enabled: true,
            highlight: HighlightConfig::default(),
        }
    }
}

impl ViewOptions {
    /// Clamp opacities into `[0, 1]`, stamp the current version and
    /// normalize the classifier settings.
    #[must_use]
    pub fn normalized(self) -> Self {
        let d = Self::default();
        Self {
            version: OPTIONS_VERSION,
            bg_opacity: unit_or(self.bg_opacity, d.bg_opacity),
            dim_opacity: unit_or(self.dim_opacity, d.dim_opacity),
            highlight: self.highlight.normalized(),
            ..self
        }
    }
}

impl From<Value> for ViewOptions {
    fn from(value: Value) -> Self {
        let Value::Object(map) = value else {
            tracing::warn!(kind = value_kind(&value), "view options are not an object, using defaults");
            return Self::default();
        };
        let d = Self::default();
        let highlight = match map.get("highlight") {
            Some(raw) => HighlightConfig::deserialize(raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "malformed highlight settings, reading legacy keys");
                legacy_highlight(&map)
            }),
            None => legacy_highlight(&map),
        };
        Self {
            version: OPTIONS_VERSION,
            bg_opacity: opacity(&map, "bgOpacity", d.bg_opacity),
            dim_opacity: opacity(&map, "dimOpacity", d.dim_opacity),
            show_label: flag(&map, &["showLabel", "showMachineLabel"], d.show_label),
            fill_enabled: flag(&map, &["fillEnabled"], d.fill_enabled),
            stroke_enabled: flag(&map, &["strokeEnabled"], d.stroke_enabled),
            highlight: highlight.normalized(),
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn opacity(map: &Map<String, Value>, key: &str, fallback: f64) -> f64 {
    map.get(key).and_then(value_number).map_or(fallback, |v| unit_or(v, fallback))
}

fn unit_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { clamp(v, 0.0, 1.0) } else { fallback }
}

fn flag(map: &Map<String, Value>, keys: &[&str], fallback: bool) -> bool {
    keys.iter().find_map(|k| map.get(*k).and_then(Value::as_bool)).unwrap_or(fallback)
}

fn number(map: &Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(value_number)
}

fn text<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

fn direction(map: &Map<String, Value>, key: &str) -> Direction {
    if text(map, key) == Some("lte") { Direction::Lte } else { Direction::Gte }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count(v: f64) -> Option<u32> {
    (v.is_finite() && v >= 1.0).then(|| v.min(f64::from(u32::MAX)) as u32)
}

/// Fold the flat legacy keys into a [`HighlightConfig`].
fn legacy_highlight(map: &Map<String, Value>) -> HighlightConfig {
    let rank_count = ["salesRankValue", "salesRankTop", "salesRankBottom"]
        .iter()
        .filter_map(|k| number(map, k))
        .find_map(count)
        .unwrap_or(DEFAULT_RANK_COUNT);
    let rank_from = if text(map, "salesRankDir") == Some("gte") { RankFrom::Bottom } else { RankFrom::Top };

    let mode = match text(map, "salesMode") {
        Some("average") => HighlightMode::Average { dir: direction(map, "salesAverageDir") },
        Some("rank") => HighlightMode::Rank { count: rank_count, from: rank_from },
        Some("quantile") => HighlightMode::Quantile {
            q: number(map, "salesQuantile").and_then(count).unwrap_or(DEFAULT_QUANTILE),
        },
        _ => HighlightMode::Threshold {
            value: number(map, "salesThreshold").map_or(0.0, |v| v.max(0.0)),
            dir: direction(map, "salesThresholdDir"),
        },
    };

    let style_blink = text(map, "highlightStyle") == Some("blink");
    let rule = match text(map, "blinkRule") {
        Some(raw) => legacy_blink_rule(raw, rank_count).unwrap_or_else(|| {
            tracing::warn!(rule = raw, "unknown blink rule, using mode-based");
            BlinkRule::ModeBased
        }),
        None if style_blink => BlinkRule::HighlightOnly,
        None => BlinkRule::ModeBased,
    };

    let blink = BlinkConfig {
        enabled: flag(map, &["blinkEnabled"], false) || style_blink,
        rule,
        rate_at_most: number(map, "rateBlinkLTE").unwrap_or(DEFAULT_RATE_AT_MOST),
        rate_at_least: number(map, "rateBlinkGTE").unwrap_or(DEFAULT_RATE_AT_LEAST),
    };
    HighlightConfig { mode, blink }
}

fn legacy_blink_rule(raw: &str, rank_count: u32) -> Option<BlinkRule> {
    let rule = match raw {
        "none" => BlinkRule::None,
        "highlight-only" => BlinkRule::HighlightOnly,
        "rate-lte" | "low-rate" => BlinkRule::RateAtMost,
        "rate-gte" => BlinkRule::RateAtLeast,
        "rate-bounds" => BlinkRule::RateBounds,
        "rank-top" => BlinkRule::RankTop { count: rank_count },
        "rank-bottom" => BlinkRule::RankBottom { count: rank_count },
        "mode-based" | "below-threshold" => BlinkRule::ModeBased,
        _ => return None,
    };
    Some(rule)
}
