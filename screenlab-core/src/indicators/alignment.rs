//! Bullish alignment — moving averages stacked fastest over slowest.
//!
//! True at t iff sma(p1)[t] > sma(p2)[t] > ... > sma(pk)[t] for the
//! configured ascending periods, and close[t] > sma(p1)[t].
//! Lookback: longest period - 1.

use super::Sma;
use crate::components::indicator::Indicator;
use crate::domain::Bar;

/// Default periods: 5 / 10 / 20 / 60.
pub const DEFAULT_ALIGNMENT_PERIODS: [usize; 4] = [5, 10, 20, 60];

#[derive(Debug, Clone)]
pub struct BullishAlignment {
    averages: Vec<Sma>,
    name: String,
}

impl BullishAlignment {
    /// Periods must be strictly ascending and non-empty.
    pub fn new(periods: &[usize]) -> Self {
        assert!(!periods.is_empty(), "alignment needs at least one period");
        assert!(
            periods.windows(2).all(|w| w[0] < w[1]),
            "alignment periods must be strictly ascending"
        );
        let name = if periods == DEFAULT_ALIGNMENT_PERIODS {
            "bullish_alignment".to_string()
        } else {
            let joined: Vec<String> = periods.iter().map(|p| p.to_string()).collect();
            format!("bullish_alignment_{}", joined.join("_"))
        };
        Self {
            averages: periods.iter().map(|&p| Sma::new(p)).collect(),
            name,
        }
    }
}

impl Default for BullishAlignment {
    fn default() -> Self {
        Self::new(&DEFAULT_ALIGNMENT_PERIODS)
    }
}

impl Indicator for BullishAlignment {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.averages.iter().map(|s| s.lookback()).max().unwrap_or(0)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let series: Vec<Vec<f64>> = self.averages.iter().map(|s| s.compute(bars)).collect();

        (0..bars.len())
            .map(|i| {
                let mas: Vec<f64> = series.iter().map(|s| s[i]).collect();
                if mas.iter().any(|v| v.is_nan()) || bars[i].close.is_nan() {
                    return f64::NAN;
                }
                let stacked = mas.windows(2).all(|w| w[0] > w[1]);
                if stacked && bars[i].close > mas[0] {
                    1.0
                } else {
                    0.0
                }
            })
            .collect()
    }
}
