//! Highlight and blink classification.
//!
//! [`classify`] is a pure function of a booth, a [`HighlightConfig`] and the
//! [`ScopeStats`] computed once per redraw. The scope is the machine-filtered
//! subset when a filter is active, otherwise the whole dataset.

#[cfg(test)]
#[path = "classify_test.rs"]
mod classify_test;

use serde::{Deserialize, Serialize};

use crate::booth::{Booth, MachineFilter, percent_to_ratio};
use crate::consts::{
    DEFAULT_QUANTILE, DEFAULT_RANK_COUNT, DEFAULT_RATE_AT_LEAST, DEFAULT_RATE_AT_MOST, MAX_QUANTILE, MIN_QUANTILE,
};

/// Comparison direction for threshold and average modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Sales at or above the reference.
    #[default]
    Gte,
    /// Sales at or below the reference.
    Lte,
}

/// Which end of the ranking `Rank` counts from.
///
/// Serialized as `lte` ("rank ≤ N from the top") and `gte` (from the bottom).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RankFrom {
    #[default]
    #[serde(rename = "lte")]
    Top,
    #[serde(rename = "gte")]
    Bottom,
}

/// How a booth qualifies as highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HighlightMode {
    /// Compare against a fixed value. Zero or below disables highlighting.
    Threshold {
        #[serde(default)]
        value: f64,
        #[serde(default)]
        dir: Direction,
    },
    /// Compare against the scope mean.
    Average {
        #[serde(default)]
        dir: Direction,
    },
    /// Top or bottom `count` booths by sales.
    Rank {
        #[serde(default = "default_rank_count")]
        count: u32,
        #[serde(default)]
        from: RankFrom,
    },
    /// Top `1/q` of the scope by sales.
    Quantile {
        #[serde(default = "default_quantile")]
        q: u32,
    },
}

impl Default for HighlightMode {
    fn default() -> Self {
        Self::Threshold { value: 0.0, dir: Direction::Gte }
    }
}

impl HighlightMode {
    /// Clamp parameters into their valid ranges.
    #[must_use]
    pub fn normalized(self) -> Self {
        match self {
            Self::Threshold { value, dir } => {
                Self::Threshold { value: if value.is_finite() { value.max(0.0) } else { 0.0 }, dir }
            }
            Self::Rank { count, from } => Self::Rank { count: count.max(1), from },
            Self::Quantile { q } => Self::Quantile { q: q.clamp(MIN_QUANTILE, MAX_QUANTILE) },
            other @ Self::Average { .. } => other,
        }
    }
}

fn default_rank_count() -> u32 {
    DEFAULT_RANK_COUNT
}

fn default_quantile() -> u32 {
    DEFAULT_QUANTILE
}

/// Which booths blink when blinking is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BlinkRule {
    None,
    /// Exactly the highlighted booths.
    HighlightOnly,
    /// Cost rate at most `rate_at_most`.
    #[serde(rename = "rate-lte", alias = "low-rate")]
    RateAtMost,
    /// Cost rate at least `rate_at_least`.
    #[serde(rename = "rate-gte")]
    RateAtLeast,
    /// Either rate bound.
    RateBounds,
    /// Top `count` by sales, whatever the highlight mode.
    RankTop {
        #[serde(default = "default_rank_count")]
        count: u32,
    },
    /// Bottom `count` by sales, whatever the highlight mode. Booths with
    /// zero or missing sales fall under any non-empty bottom cutoff.
    RankBottom {
        #[serde(default = "default_rank_count")]
        count: u32,
    },
    /// Everything not highlighted.
    #[default]
    #[serde(alias = "below-threshold")]
    ModeBased,
}

/// Blink toggle, rule and cost-rate bounds (ratios, not percentages).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlinkConfig {
    pub enabled: bool,
    pub rule: BlinkRule,
    pub rate_at_most: f64,
    pub rate_at_least: f64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rule: BlinkRule::ModeBased,
            rate_at_most: DEFAULT_RATE_AT_MOST,
            rate_at_least: DEFAULT_RATE_AT_LEAST,
        }
    }
}

impl BlinkConfig {
    /// Fold percentages into ratios and replace invalid bounds with defaults.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            rate_at_most: normalize_rate(self.rate_at_most, DEFAULT_RATE_AT_MOST),
            rate_at_least: normalize_rate(self.rate_at_least, DEFAULT_RATE_AT_LEAST),
            rule: match self.rule {
                BlinkRule::RankTop { count } => BlinkRule::RankTop { count: count.max(1) },
                BlinkRule::RankBottom { count } => BlinkRule::RankBottom { count: count.max(1) },
                other => other,
            },
            ..self
        }
    }
}

/// A cost-rate bound: percentages above 1 become ratios, capped at 1.
#[must_use]
pub fn normalize_rate(v: f64, fallback: f64) -> f64 {
    if !v.is_finite() || v < 0.0 {
        return fallback;
    }
    percent_to_ratio(v).min(1.0)
}

/// Everything [`classify`] needs besides the booth and its scope.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub mode: HighlightMode,
    pub blink: BlinkConfig,
}

impl HighlightConfig {
    #[must_use]
    pub fn normalized(self) -> Self {
        Self { mode: self.mode.normalized(), blink: self.blink.normalized() }
    }
}

// =============================================================
// Scope statistics
// =============================================================

/// Per-redraw aggregates over the current scope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScopeStats {
    filter: MachineFilter,
    /// Positive sales, largest first.
    positive_desc: Vec<f64>,
    /// Every finite sales figure, smallest first.
    all_asc: Vec<f64>,
    mean: f64,
}

impl ScopeStats {
    #[must_use]
    pub fn compute<'a>(booths: impl IntoIterator<Item = &'a Booth>, filter: &MachineFilter) -> Self {
        let mut all_asc: Vec<f64> = booths
            .into_iter()
            .filter(|b| filter.admits(b))
            .filter_map(|b| b.sales)
            .filter(|s| s.is_finite())
            .collect();
        all_asc.sort_by(f64::total_cmp);
        let mut positive_desc: Vec<f64> = all_asc.iter().copied().filter(|s| *s > 0.0).collect();
        positive_desc.reverse();
        let mean = if all_asc.is_empty() { 0.0 } else { all_asc.iter().sum::<f64>() / len_f64(&all_asc) };
        Self { filter: filter.clone(), positive_desc, all_asc, mean }
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    #[must_use]
    pub fn filter(&self) -> &MachineFilter {
        &self.filter
    }

    /// Sales of the `n`-th best booth; `+inf` for an empty scope.
    #[must_use]
    pub fn top_cutoff(&self, n: u32) -> f64 {
        nth_or(&self.positive_desc, n, f64::INFINITY)
    }

    /// Sales of the `n`-th worst booth with positive sales; `-inf` for an empty scope.
    #[must_use]
    pub fn bottom_cutoff(&self, n: u32) -> f64 {
        let len = self.positive_desc.len();
        if len == 0 {
            return f64::NEG_INFINITY;
        }
        let idx = (n.max(1) as usize - 1).min(len - 1);
        self.positive_desc[len - 1 - idx]
    }

    /// Color bounds: scope min/max while a filter narrows the scope, else `global`.
    #[must_use]
    pub fn color_bounds(&self, global: (f64, f64)) -> (f64, f64) {
        match (self.positive_desc.last(), self.positive_desc.first()) {
            (Some(&mn), Some(&mx)) if self.filter.is_active() && mx > mn => (mn, mx),
            _ => global,
        }
    }

    fn quantile_member(&self, s: f64, q: u32) -> bool {
        let q = q.clamp(MIN_QUANTILE, MAX_QUANTILE) as usize;
        let len = self.all_asc.len();
        if len < q {
            return true;
        }
        let idx = len * (q - 1) / q;
        s >= self.all_asc[idx]
    }
}

fn nth_or(values: &[f64], n: u32, empty: f64) -> f64 {
    if values.is_empty() {
        return empty;
    }
    let idx = (n.max(1) as usize - 1).min(values.len() - 1);
    values[idx]
}

#[allow(clippy::cast_precision_loss)]
fn len_f64(values: &[f64]) -> f64 {
    values.len() as f64
}

// =============================================================
// Classification
// =============================================================

/// Outcome for one booth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Classification {
    pub highlighted: bool,
    pub blink: bool,
}

/// Decide whether `booth` is highlighted and whether it blinks.
#[must_use]
pub fn classify(booth: &Booth, config: &HighlightConfig, scope: &ScopeStats) -> Classification {
    let highlighted = is_highlighted(booth, config.mode, scope);
    let blink = config.blink.enabled && scope.filter.admits(booth) && blinks(booth, highlighted, &config.blink, scope);
    Classification { highlighted, blink }
}

fn is_highlighted(booth: &Booth, mode: HighlightMode, scope: &ScopeStats) -> bool {
    let Some(s) = booth.positive_sales() else {
        return false;
    };
    match mode {
        HighlightMode::Threshold { value, dir } => {
            if !value.is_finite() || value <= 0.0 {
                return false;
            }
            compare(s, value, dir)
        }
        HighlightMode::Average { dir } => compare(s, scope.mean, dir),
        HighlightMode::Rank { count, from: RankFrom::Top } => s >= scope.top_cutoff(count),
        HighlightMode::Rank { count, from: RankFrom::Bottom } => s <= scope.bottom_cutoff(count),
        HighlightMode::Quantile { q } => scope.quantile_member(s, q),
    }
}

fn compare(s: f64, reference: f64, dir: Direction) -> bool {
    match dir {
        Direction::Gte => s >= reference,
        Direction::Lte => s <= reference,
    }
}

fn blinks(booth: &Booth, highlighted: bool, blink: &BlinkConfig, scope: &ScopeStats) -> bool {
    let rate = booth.rate;
    match blink.rule {
        BlinkRule::None => false,
        BlinkRule::HighlightOnly => highlighted,
        BlinkRule::RateAtMost => rate.is_some_and(|r| r <= blink.rate_at_most),
        BlinkRule::RateAtLeast => rate.is_some_and(|r| r >= blink.rate_at_least),
        BlinkRule::RateBounds => rate.is_some_and(|r| r <= blink.rate_at_most || r >= blink.rate_at_least),
        BlinkRule::RankTop { count } => sales_or_zero(booth) >= scope.top_cutoff(count),
        BlinkRule::RankBottom { count } => sales_or_zero(booth) <= scope.bottom_cutoff(count),
        BlinkRule::ModeBased => !highlighted,
    }
}

/// Rank blinking counts missing sales as zero, so idle booths join the bottom.
fn sales_or_zero(booth: &Booth) -> f64 {
    booth.sales.filter(|s| s.is_finite()).unwrap_or(0.0)
}
