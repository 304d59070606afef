#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;

fn parse(value: serde_json::Value) -> ViewOptions {
    serde_json::from_value(value).unwrap()
}

// =============================================================
// Current shape
// =============================================================

#[test]
fn defaults() {
    let o = ViewOptions::default();
    assert_eq!(o.version, OPTIONS_VERSION);
    assert_eq!(o.bg_opacity, 0.35);
    assert!(o.show_label && o.fill_enabled && o.stroke_enabled);
    assert_eq!(o.highlight, HighlightConfig::default());
}

#[test]
fn current_shape_survives_save_and_load() {
    let mut o = ViewOptions { bg_opacity: 0.8, show_label: false, ..ViewOptions::default() };
    o.highlight.mode = HighlightMode::Rank { count: 5, from: RankFrom::Bottom };
    o.highlight.blink = BlinkConfig { enabled: true, rule: BlinkRule::RankTop { count: 3 }, ..BlinkConfig::default() };
    let text = serde_json::to_string(&o).unwrap();
    assert!(text.contains("\"bgOpacity\":0.8"));
    let back: ViewOptions = serde_json::from_str(&text).unwrap();
    assert_eq!(back, o);
}

#[test]
fn missing_fields_use_defaults() {
    let o = parse(json!({ "fillEnabled": false }));
    assert!(!o.fill_enabled);
    assert!(o.stroke_enabled);
    assert_eq!(o.dim_opacity, 0.35);
}

#[test]
fn opacities_are_clamped() {
    let o = parse(json!({ "bgOpacity": 3, "dimOpacity": "-1" }));
    assert_eq!(o.bg_opacity, 1.0);
    assert_eq!(o.dim_opacity, 0.0);
}

#[test]
fn non_object_yields_defaults() {
    assert_eq!(parse(json!([1, 2, 3])), ViewOptions::default());
    assert_eq!(parse(json!(null)), ViewOptions::default());
}

#[test]
fn nested_highlight_is_normalized() {
    let o = parse(json!({ "highlight": { "mode": { "kind": "quantile", "q": 99 }, "blink": { "rateAtMost": 15 } } }));
    assert_eq!(o.highlight.mode, HighlightMode::Quantile { q: 10 });
    assert_eq!(o.highlight.blink.rate_at_most, 0.15);
}

#[test]
fn malformed_highlight_falls_back_to_legacy_keys() {
    let o = parse(json!({ "highlight": { "mode": { "kind": "bogus" } }, "salesMode": "average", "salesAverageDir": "lte" }));
    assert_eq!(o.highlight.mode, HighlightMode::Average { dir: Direction::Lte });
}

// =============================================================
// Legacy flat shape
// =============================================================

#[test]
fn legacy_threshold() {
    let o = parse(json!({ "salesThreshold": 10000, "salesThresholdDir": "lte", "showMachineLabel": false }));
    assert_eq!(o.highlight.mode, HighlightMode::Threshold { value: 10000.0, dir: Direction::Lte });
    assert!(!o.show_label);
}

#[test]
fn legacy_negative_threshold_disables() {
    let o = parse(json!({ "salesThreshold": -5 }));
    assert_eq!(o.highlight.mode, HighlightMode::Threshold { value: 0.0, dir: Direction::Gte });
}

#[test]
fn legacy_rank_reads_fallback_counts() {
    let o = parse(json!({ "salesMode": "rank", "salesRankDir": "gte", "salesRankTop": 7 }));
    assert_eq!(o.highlight.mode, HighlightMode::Rank { count: 7, from: RankFrom::Bottom });
    let o = parse(json!({ "salesMode": "rank" }));
    assert_eq!(o.highlight.mode, HighlightMode::Rank { count: 10, from: RankFrom::Top });
}

#[test]
fn legacy_quantile_is_clamped() {
    let o = parse(json!({ "salesMode": "quantile", "salesQuantile": "12" }));
    assert_eq!(o.highlight.mode, HighlightMode::Quantile { q: 10 });
}

#[test]
fn legacy_blink_rules() {
    let o = parse(json!({ "blinkEnabled": true, "blinkRule": "low-rate", "rateBlinkLTE": 20, "rateBlinkGTE": 0.5 }));
    assert!(o.highlight.blink.enabled);
    assert_eq!(o.highlight.blink.rule, BlinkRule::RateAtMost);
    assert_eq!(o.highlight.blink.rate_at_most, 0.2);
    assert_eq!(o.highlight.blink.rate_at_least, 0.5);

    let o = parse(json!({ "blinkRule": "rank-bottom", "salesRankValue": 4 }));
    assert_eq!(o.highlight.blink.rule, BlinkRule::RankBottom { count: 4 });
    assert!(!o.highlight.blink.enabled);
}

#[test]
fn legacy_blink_style_implies_highlight_only() {
    let o = parse(json!({ "highlightStyle": "blink" }));
    assert!(o.highlight.blink.enabled);
    assert_eq!(o.highlight.blink.rule, BlinkRule::HighlightOnly);
}

#[test]
fn legacy_unknown_rule_is_mode_based() {
    let o = parse(json!({ "blinkRule": "sparkle" }));
    assert_eq!(o.highlight.blink.rule, BlinkRule::ModeBased);
}
