//! Rolling high — highest high over a trailing window.
//!
//! Two variants:
//! - Inclusive: max(high[t-window+1..=t]), lookback window - 1.
//! - Prior: max(high[t-window..t]), excluding bar t itself, lookback window.
//!   Breakout and drawdown rules compare today's close against the prior
//!   peak so that today's bar can never be its own peak.

use crate::components::indicator::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct RollingHigh {
    window: usize,
    exclude_current: bool,
    name: String,
}

impl RollingHigh {
    pub fn inclusive(window: usize) -> Self {
        assert!(window >= 1, "rolling high window must be >= 1");
        Self {
            window,
            exclude_current: false,
            name: format!("rolling_high_{window}"),
        }
    }

    pub fn prior(window: usize) -> Self {
        assert!(window >= 1, "rolling high window must be >= 1");
        Self {
            window,
            exclude_current: true,
            name: format!("prior_high_{window}"),
        }
    }
}

impl Indicator for RollingHigh {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        if self.exclude_current {
            self.window
        } else {
            self.window - 1
        }
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        for (i, slot) in result.iter_mut().enumerate().skip(self.lookback()) {
            let end = if self.exclude_current { i } else { i + 1 };
            let window = &bars[end - self.window..end];
            if window.iter().any(|b| b.high.is_nan()) {
                continue;
            }
            *slot = window
                .iter()
                .map(|b| b.high)
                .fold(f64::NEG_INFINITY, f64::max);
        }

        result
    }
}
