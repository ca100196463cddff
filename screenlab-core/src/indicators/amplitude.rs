//! Daily amplitude — intraday range relative to the previous close.
//!
//! amplitude[t] = (high[t] - low[t]) / close[t-1]
//! Lookback: 1 (undefined at index 0).

use crate::components::indicator::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, Default)]
pub struct Amplitude;

impl Amplitude {
    pub fn value_at(bars: &[Bar], i: usize) -> Option<f64> {
        if i == 0 || i >= bars.len() {
            return None;
        }
        let prev_close = bars[i - 1].close;
        let value = (bars[i].high - bars[i].low) / prev_close;
        (prev_close > 0.0 && value.is_finite()).then_some(value)
    }
}

impl Indicator for Amplitude {
    fn name(&self) -> &str {
        "amplitude"
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        (0..bars.len())
            .map(|i| Self::value_at(bars, i).unwrap_or(f64::NAN))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlcv_bars, DEFAULT_EPSILON};

    #[test]
    fn amplitude_uses_previous_close() {
        let bars = make_ohlcv_bars(&[
            (10.0, 10.5, 9.5, 10.0, 1000),
            (10.0, 11.0, 10.2, 10.8, 1000),
        ]);
        let result = Amplitude.compute(&bars);
        assert!(result[0].is_nan());
        // (11.0 - 10.2) / 10.0 = 0.08
        assert_approx(result[1], 0.08, DEFAULT_EPSILON);
    }

    #[test]
    fn amplitude_lookback() {
        assert_eq!(Amplitude.lookback(), 1);
        assert_eq!(Amplitude.required_bars(), 2);
    }
}
