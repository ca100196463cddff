//! Indicator Engine: bar series in, aligned indicator series out.
//!
//! Every indicator implements the `Indicator` trait from `components::indicator`.
//! Output series are aligned index-for-index with the bars; positions without
//! enough history are NaN, never zero-filled.
//!
//! Indicators are addressed by canonical names (see [`parse_indicator`]) so
//! that rules and callers can request them by string and the registry can
//! deduplicate the union of requests.

pub mod alignment;
pub mod amplitude;
pub mod catalog;
pub mod consecutive;
pub mod drawdown;
pub mod momentum;
pub mod precompute;
pub mod rolling_high;
pub mod sma;
pub mod volume_ratio;

pub use alignment::{BullishAlignment, DEFAULT_ALIGNMENT_PERIODS};
pub use amplitude::Amplitude;
pub use catalog::parse_indicator;
pub use consecutive::{consecutive, BarPredicate, Consecutive};
pub use drawdown::Drawdown;
pub use momentum::{DailyReturn, Momentum};
pub use precompute::{compute_indicators, precompute, IndicatorError};
pub use rolling_high::RollingHigh;
pub use sma::Sma;
pub use volume_ratio::VolumeRatio;

/// Trailing arithmetic mean over `period` values ending at each index.
///
/// NaN for the first `period - 1` positions and for any window that
/// contains a NaN.
pub(crate) fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    let mut sum = 0.0;
    let mut nan_count = 0usize;

    for i in 0..n {
        if values[i].is_nan() {
            nan_count += 1;
        } else {
            sum += values[i];
        }
        if i >= period {
            let leaving = values[i - period];
            if leaving.is_nan() {
                nan_count -= 1;
            } else {
                sum -= leaving;
            }
        }
        if i + 1 >= period && nan_count == 0 {
            result[i] = sum / period as f64;
        }
    }

    result
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    let data: Vec<_> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            (open, open.max(close) + 1.0, open.min(close) - 1.0, close, 1000)
        })
        .collect();
    make_ohlcv_bars(&data)
}

/// Create bars from explicit (open, high, low, close, volume) tuples.
#[cfg(test)]
pub fn make_ohlcv_bars(data: &[(f64, f64, f64, f64, u64)]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close, volume))| Bar {
            date: base_date + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
