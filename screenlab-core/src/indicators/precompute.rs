//! Indicator computation for one bar series.
//!
//! Two entry points:
//! - [`compute_indicators`] is strict: a requested indicator whose window
//!   exceeds the series is reported as `InsufficientHistory`.
//! - [`precompute`] is lenient: short indicators are computed anyway and
//!   stay NaN where undefined. The rule registry uses it so that one rule's
//!   long window cannot starve sibling rules of their indicators.

use crate::components::indicator::{Indicator, IndicatorValues};
use crate::domain::BarSeries;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("insufficient history for {indicator}: needs {required} bars, series has {available}")]
    InsufficientHistory {
        indicator: String,
        required: usize,
        available: usize,
    },

    #[error("unknown indicator: {0}")]
    UnknownIndicator(String),
}

/// Compute every requested indicator, failing on the first one the series
/// is too short for. Duplicate names are computed once.
pub fn compute_indicators(
    series: &BarSeries,
    requested: &[Box<dyn Indicator>],
) -> Result<IndicatorValues, IndicatorError> {
    if let Some(short) = requested.iter().find(|i| i.required_bars() > series.len()) {
        return Err(IndicatorError::InsufficientHistory {
            indicator: short.name().to_string(),
            required: short.required_bars(),
            available: series.len(),
        });
    }
    Ok(precompute(series, requested))
}

/// Compute every requested indicator regardless of series length.
pub fn precompute(series: &BarSeries, requested: &[Box<dyn Indicator>]) -> IndicatorValues {
    let bars = series.bars();
    let mut iv = IndicatorValues::new();

    for indicator in requested {
        if iv.contains(indicator.name()) {
            continue;
        }
        let values = indicator.compute(bars);
        debug_assert_eq!(
            values.len(),
            bars.len(),
            "indicator '{}' produced {} values for {} bars (symbol={})",
            indicator.name(),
            values.len(),
            bars.len(),
            series.symbol()
        );
        iv.insert(indicator.name(), values);
    }

    iv
}
