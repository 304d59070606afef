//! Booth records: typed access to spreadsheet rows and the label grouping.
//!
//! Rows arrive as JSON objects keyed by whatever headers the export used.
//! [`Row`] resolves each field through a fixed list of synonyms; [`Booth`] is
//! the normalized form every other module consumes. [`Dataset`] groups booths
//! by label in draw order and carries the global sales bounds.

#[cfg(test)]
#[path = "booth_test.rs"]
mod booth_test;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::consts::COST_RATE_FACTOR;
use crate::numeric::value_number;

/// Group label shared by the booths drawn as one unit.
pub type Label = String;

const MACHINE_KEYS: &[&str] = &["対応マシン名", "machine"];
const SALES_KEYS: &[&str] = &["総売上", "sales"];
const COUNT_KEYS: &[&str] = &["消化数", "count"];
const COST_KEYS: &[&str] = &["消化額", "cost"];
const RATE_KEYS: &[&str] = &["原価率", "costRate", "rate", "cost_ratio", "costRatePercent"];
const PRIZE_KEYS: &[&str] = &["景品名", "prize"];
const LABEL_KEYS: &[&str] = &["ラベルID", "label"];
const BOOTH_KEYS: &[&str] = &["ブースID", "boothId", "id"];
const WIDTH_KEYS: &[&str] = &["幅", "width"];
const DEPTH_KEYS: &[&str] = &["奥行き", "奥行", "depth"];

/// One spreadsheet row, after header normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(pub serde_json::Map<String, serde_json::Value>);

impl Row {
    fn first(&self, keys: &[&str]) -> Option<&serde_json::Value> {
        keys.iter()
            .filter_map(|k| self.0.get(*k))
            .find(|v| !v.is_null() && v.as_str().is_none_or(|s| !s.trim().is_empty()))
    }

    /// First non-empty text value among `keys`. Numbers are rendered as text.
    #[must_use]
    pub fn text(&self, keys: &[&str]) -> Option<String> {
        match self.first(keys)? {
            serde_json::Value::String(s) => Some(s.trim().to_owned()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// First numeric value among `keys`.
    #[must_use]
    pub fn number(&self, keys: &[&str]) -> Option<f64> {
        keys.iter().filter_map(|k| self.0.get(*k)).find_map(value_number)
    }
}

/// A normalized booth.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booth {
    pub label: Label,
    pub booth_id: String,
    pub prize: String,
    pub machine: String,
    /// Machine name folded for comparisons, see [`normalize_machine_name`].
    #[serde(skip)]
    pub machine_key: String,
    pub sales: Option<f64>,
    pub count: Option<f64>,
    pub cost: Option<f64>,
    pub rate: Option<f64>,
    #[serde(skip)]
    pub width: Option<f64>,
    #[serde(skip)]
    pub depth: Option<f64>,
}

impl Booth {
    /// Normalize a row. Rows without a usable label yield `None`.
    #[must_use]
    pub fn from_row(row: &Row) -> Option<Self> {
        let label = clean_label(&row.text(LABEL_KEYS)?);
        if label.is_empty() {
            return None;
        }
        let machine = row.text(MACHINE_KEYS).unwrap_or_default();
        let sales = row.number(SALES_KEYS);
        let cost = row.number(COST_KEYS);
        let rate = cost_rate(sales, cost).or_else(|| row.number(RATE_KEYS).map(percent_to_ratio));
        Some(Self {
            booth_id: row.text(BOOTH_KEYS).unwrap_or_else(|| label.clone()),
            prize: row.text(PRIZE_KEYS).unwrap_or_default(),
            machine_key: normalize_machine_name(&machine),
            machine,
            sales,
            count: row.number(COUNT_KEYS),
            cost,
            rate,
            width: row.number(WIDTH_KEYS),
            depth: row.number(DEPTH_KEYS),
            label,
        })
    }

    /// Sales when strictly positive.
    #[must_use]
    pub fn positive_sales(&self) -> Option<f64> {
        self.sales.filter(|s| *s > 0.0)
    }
}

/// `cost * 1.1 / sales`, defined only for positive sales and a known cost.
#[must_use]
pub fn cost_rate(sales: Option<f64>, cost: Option<f64>) -> Option<f64> {
    let s = sales.filter(|s| *s > 0.0)?;
    let r = cost? * COST_RATE_FACTOR / s;
    r.is_finite().then_some(r)
}

/// Values above 1 are percentages.
#[must_use]
pub fn percent_to_ratio(v: f64) -> f64 {
    if v > 1.0 { v / 100.0 } else { v }
}

fn clean_label(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '\u{200B}'..='\u{200D}' | '\u{FEFF}'))
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Fold full-width ASCII to half-width, drop whitespace, upper-case.
#[must_use]
pub fn normalize_machine_name(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(u32::from(c) - 0xFEE0).unwrap_or(c),
            other => other,
        })
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

// =============================================================
// Dataset
// =============================================================

/// Booths grouped by label, in draw order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    labels: Vec<Label>,
    by_label: BTreeMap<Label, Vec<Booth>>,
    sales_min: f64,
    sales_max: f64,
}

impl Dataset {
    /// Group rows by label. Rows without a label are dropped.
    #[must_use]
    pub fn from_rows(rows: &[Row]) -> Self {
        Self::from_booths(rows.iter().filter_map(Booth::from_row))
    }

    #[must_use]
    pub fn from_booths(booths: impl IntoIterator<Item = Booth>) -> Self {
        let mut by_label: BTreeMap<Label, Vec<Booth>> = BTreeMap::new();
        for booth in booths {
            by_label.entry(booth.label.clone()).or_default().push(booth);
        }
        let labels = by_label.keys().cloned().collect();
        let (sales_min, sales_max) = sales_bounds(by_label.values().flatten());
        Self { labels, by_label, sales_min, sales_max }
    }

    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Booths of one group; empty for unknown labels.
    #[must_use]
    pub fn group(&self, label: &str) -> &[Booth] {
        self.by_label.get(label).map_or(&[], Vec::as_slice)
    }

    pub fn booths(&self) -> impl Iterator<Item = &Booth> {
        self.by_label.values().flatten()
    }

    /// Global `(min, max)` over positive sales; `(0, 0)` when there are none.
    #[must_use]
    pub fn sales_bounds(&self) -> (f64, f64) {
        (self.sales_min, self.sales_max)
    }

    /// Distinct normalized machine names.
    #[must_use]
    pub fn machine_keys(&self) -> BTreeSet<String> {
        self.booths()
            .filter(|b| !b.machine_key.is_empty())
            .map(|b| b.machine_key.clone())
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn sales_bounds<'a>(booths: impl Iterator<Item = &'a Booth>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for s in booths.filter_map(Booth::positive_sales) {
        min = min.min(s);
        max = max.max(s);
    }
    if min.is_finite() { (min, max) } else { (0.0, 0.0) }
}

// =============================================================
// Machine filter
// =============================================================

/// The operator's machine selection, compared on normalized names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineFilter {
    selected: BTreeSet<String>,
    active: bool,
}

impl MachineFilter {
    /// Build a filter from raw machine names. It is active only when it
    /// selects something and leaves at least one machine of `dataset` out.
    #[must_use]
    pub fn new<I, S>(names: I, dataset: &Dataset) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selected: BTreeSet<String> = names
            .into_iter()
            .map(|n| normalize_machine_name(n.as_ref()))
            .filter(|n| !n.is_empty())
            .collect();
        let active = !selected.is_empty() && !dataset.machine_keys().is_subset(&selected);
        Self { selected, active }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn admits(&self, booth: &Booth) -> bool {
        !self.active || self.selected.contains(&booth.machine_key)
    }
}
