//! Drawdown from a rolling high.
//!
//! drawdown[t] = (close[t] - high_ref[t]) / high_ref[t]
//!
//! With the inclusive rolling high the value is always <= 0. The prior
//! variant measures against the peak of the bars before t, so a fresh
//! breakout shows a positive value.

use super::RollingHigh;
use crate::components::indicator::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Drawdown {
    high: RollingHigh,
    name: String,
}

impl Drawdown {
    pub fn new(window: usize) -> Self {
        Self {
            high: RollingHigh::inclusive(window),
            name: format!("drawdown_{window}"),
        }
    }

    pub fn from_prior_high(window: usize) -> Self {
        Self {
            high: RollingHigh::prior(window),
            name: format!("prior_drawdown_{window}"),
        }
    }
}

impl Indicator for Drawdown {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.high.lookback()
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        self.high
            .compute(bars)
            .into_iter()
            .zip(bars)
            .map(|(peak, bar)| {
                if peak > 0.0 {
                    (bar.close - peak) / peak
                } else {
                    f64::NAN
                }
            })
            .collect()
    }
}
