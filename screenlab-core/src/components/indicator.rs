//! Indicator trait and precomputed indicator values container.
//!
//! Indicators are pure functions: bar history in, numeric series out.
//! They are computed once per evaluation call and shared read-only by
//! every rule that asks for them.

use crate::domain::Bar;
use std::collections::HashMap;

/// Trait for indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length. The first `lookback()` values are `f64::NAN` (warmup).
/// Boolean indicators encode true/false as `1.0`/`0.0`.
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
/// Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Canonical name (e.g., "sma_10", "prior_high_240").
    fn name(&self) -> &str;

    /// Number of leading bars with undefined output.
    fn lookback(&self) -> usize;

    /// Minimum series length for the indicator to be defined at the last bar.
    fn required_bars(&self) -> usize {
        self.lookback().saturating_add(1)
    }

    /// Compute the indicator for the entire bar series.
    ///
    /// Returns a `Vec<f64>` of the same length as `bars`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Container for precomputed indicator values.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a named indicator series.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.series.contains_key(name)
    }

    /// Get the indicator value at a specific bar index.
    pub fn get(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.series
            .get(name)
            .and_then(|v| v.get(bar_index).copied())
    }

    /// Defined (non-NaN) value at `bar_index`; `None` when missing or undefined.
    pub fn value(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.get(name, bar_index).filter(|v| !v.is_nan())
    }

    /// Boolean reading of a flag indicator; `None` when missing or undefined.
    pub fn flag(&self, name: &str, bar_index: usize) -> Option<bool> {
        self.value(name, bar_index).map(|v| v != 0.0)
    }

    /// Defined value at the last position of the series.
    pub fn latest(&self, name: &str) -> Option<f64> {
        let series = self.series.get(name)?;
        series.last().copied().filter(|v| !v.is_nan())
    }

    /// Get the full series for a named indicator.
    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    /// Number of indicator series stored.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
