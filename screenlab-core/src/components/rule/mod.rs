//! Rule evaluation — pattern detectors that turn bars + indicators into a
//! structured, explainable verdict.
//!
//! Rules never see other rules, other symbols, or any scan state. A rule
//! receives one bar series, the indicators precomputed for it, and its own
//! configuration, and returns a fresh `Verdict`. Every fault inside a rule
//! (short history, bad parameter, missing indicator) is reported as an
//! `Outcome::Error` verdict, never as a panic or an `Err`.

pub mod golden_pit;
pub mod trend_breakout;

pub use golden_pit::GoldenPit;
pub use trend_breakout::TrendBreakout;

use crate::config::{ParamSchema, RuleConfig};
use crate::domain::BarSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::indicator::{Indicator, IndicatorValues};

/// Condition name used for faults that are not tied to a pattern condition.
pub const FAULT_CONDITION: &str = "error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Pass,
    Partial,
    Fail,
    Error,
}

impl Outcome {
    /// PASS when every condition holds, PARTIAL when exactly one is
    /// missing, FAIL otherwise.
    pub fn from_met(met: usize, total: usize) -> Self {
        if met == total {
            Outcome::Pass
        } else if met + 1 == total {
            Outcome::Partial
        } else {
            Outcome::Fail
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pass => "PASS",
            Outcome::Partial => "PARTIAL",
            Outcome::Fail => "FAIL",
            Outcome::Error => "ERROR",
        }
    }
}

/// One named condition of a rule, with the numbers behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub met: bool,
    pub detail: String,
}

impl Condition {
    pub fn new(met: bool, detail: impl Into<String>) -> Self {
        Self {
            met,
            detail: detail.into(),
        }
    }
}

/// A rule's output for one symbol. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub symbol: String,
    pub rule_name: String,
    pub outcome: Outcome,
    /// In [0, 100].
    pub score: f64,
    /// In [0, 1].
    pub confidence: f64,
    pub conditions: BTreeMap<String, Condition>,
    /// Date of the bar the rule was evaluated at.
    pub evaluated_at: NaiveDate,
}

impl Verdict {
    /// Score and confidence are clamped into range.
    pub fn new(
        series: &BarSeries,
        rule_name: &str,
        outcome: Outcome,
        score: f64,
        confidence: f64,
        conditions: BTreeMap<String, Condition>,
    ) -> Self {
        Self {
            symbol: series.symbol().to_string(),
            rule_name: rule_name.to_string(),
            outcome,
            score: clamp_or_zero(score, 0.0, 100.0),
            confidence: clamp_or_zero(confidence, 0.0, 1.0),
            conditions,
            evaluated_at: series.last_date(),
        }
    }

    /// An ERROR verdict carrying a single human-readable fault condition.
    pub fn error(series: &BarSeries, rule_name: &str, detail: impl Into<String>) -> Self {
        let mut conditions = BTreeMap::new();
        conditions.insert(FAULT_CONDITION.to_string(), Condition::new(false, detail));
        Self::new(series, rule_name, Outcome::Error, 0.0, 0.0, conditions)
    }

    pub fn is_error(&self) -> bool {
        self.outcome == Outcome::Error
    }

    pub fn met_count(&self) -> usize {
        self.conditions.values().filter(|c| c.met).count()
    }

    /// The fault description of an ERROR verdict.
    pub fn error_reason(&self) -> Option<&str> {
        if !self.is_error() {
            return None;
        }
        self.conditions
            .get(FAULT_CONDITION)
            .map(|c| c.detail.as_str())
    }
}

fn clamp_or_zero(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        lo
    } else {
        value.clamp(lo, hi)
    }
}

/// Trait for screening rules.
///
/// # Architecture invariant
/// `evaluate` must not panic and must only read bars up to the last bar of
/// the series. Implementations are stateless: the same inputs always give
/// the same verdict.
pub trait Rule: Send + Sync {
    /// Registered identifier, used as `Verdict::rule_name`.
    fn name(&self) -> &str;

    /// Kind tag (e.g., "golden_pit").
    fn kind(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Recognized params and thresholds.
    fn schema(&self) -> &'static ParamSchema;

    /// Eager configuration check, run once at registration.
    fn validate(&self, config: &RuleConfig) -> Result<(), String> {
        self.schema().validate(config)
    }

    /// Indicators this rule reads, under the given config.
    fn required_indicators(&self, config: &RuleConfig) -> Vec<Box<dyn Indicator>>;

    /// Named history windows this rule needs, as (label, bars).
    fn history_windows(&self, config: &RuleConfig) -> Vec<(String, usize)> {
        self.required_indicators(config)
            .iter()
            .map(|i| (i.name().to_string(), i.required_bars()))
            .collect()
    }

    /// Longest history window, in bars.
    fn required_bars(&self, config: &RuleConfig) -> usize {
        self.history_windows(config)
            .into_iter()
            .map(|(_, bars)| bars)
            .max()
            .unwrap_or(1)
    }

    fn evaluate(
        &self,
        series: &BarSeries,
        indicators: &IndicatorValues,
        config: &RuleConfig,
    ) -> Verdict;
}

/// The longest window the series cannot cover, as an error detail.
pub fn check_history(series: &BarSeries, windows: &[(String, usize)]) -> Result<(), String> {
    let available = series.len();
    match windows
        .iter()
        .filter(|(_, required)| *required > available)
        .max_by_key(|(_, required)| *required)
    {
        Some((label, required)) => Err(format!(
            "insufficient history: {label} needs {required} bars, series has {available}"
        )),
        None => Ok(()),
    }
}

/// Sub-score of a met condition: 60 at the threshold, rising linearly with
/// relative excess to 100 at double the threshold.
pub fn graded_score(excess: f64) -> f64 {
    let excess = if excess.is_nan() { 0.0 } else { excess };
    60.0 + 40.0 * excess.clamp(0.0, 1.0)
}

/// 0.5 at the pass threshold, 1.0 at a perfect score, falling toward 0
/// below the threshold.
pub fn confidence(score: f64, min_score: f64) -> f64 {
    let span = (100.0 - min_score).max(f64::EPSILON);
    (0.5 + 0.5 * (score - min_score) / span).clamp(0.0, 1.0)
}

/// Relative distance of `value` beyond `threshold`.
pub(crate) fn relative_excess(value: f64, threshold: f64) -> f64 {
    if threshold.abs() < f64::EPSILON {
        return value;
    }
    (value - threshold) / threshold.abs()
}

/// ERROR verdict for an indicator the registry did not supply.
pub(crate) fn missing_indicator(series: &BarSeries, rule: &str, indicator: &str) -> Verdict {
    Verdict::error(
        series,
        rule,
        format!("indicator {indicator} is undefined at the last bar"),
    )
}
