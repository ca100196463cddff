//! Momentum — percentage change of close over a lookback.
//!
//! momentum[t] = close[t] / close[t-period] - 1
//! Lookback: period. `DailyReturn` is the one-bar case under its own name.

use crate::components::indicator::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Momentum {
    period: usize,
    name: String,
}

impl Momentum {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Momentum period must be >= 1");
        Self {
            period,
            name: format!("momentum_{period}"),
        }
    }
}

impl Indicator for Momentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        for i in self.period..n {
            result[i] = pct_change(bars[i - self.period].close, bars[i].close);
        }

        result
    }
}

/// close[t] / close[t-1] - 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyReturn;

impl DailyReturn {
    pub fn value_at(bars: &[Bar], i: usize) -> Option<f64> {
        if i == 0 || i >= bars.len() {
            return None;
        }
        let value = pct_change(bars[i - 1].close, bars[i].close);
        (!value.is_nan()).then_some(value)
    }
}

impl Indicator for DailyReturn {
    fn name(&self) -> &str {
        "daily_return"
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

fn pct_change(prev: f64, curr: f64) -> f64 {
    if prev > 0.0 && curr.is_finite() {
        curr / prev - 1.0
    } else {
        f64::NAN
    }
}
