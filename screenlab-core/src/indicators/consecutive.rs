//! Consecutive condition — a per-bar predicate that must hold on every one
//! of the trailing `days` bars.
//!
//! This is a sliding-window AND, not "any day in the window". A window
//! containing an undefined predicate value is undefined.

use std::fmt;
use std::sync::Arc;

use crate::components::indicator::Indicator;
use crate::domain::Bar;

/// Per-bar predicate: `None` when the predicate is undefined at that index.
pub type BarPredicate = dyn Fn(&[Bar], usize) -> Option<bool> + Send + Sync;

/// Sliding-window AND over a flag series.
///
/// `out[i]` is `Some(true)` iff `flags[i+1-days..=i]` are all `Some(true)`,
/// `Some(false)` iff the window is complete, defined, and has a false, and
/// `None` otherwise.
pub fn consecutive(flags: &[Option<bool>], days: usize) -> Vec<Option<bool>> {
    assert!(days >= 1, "consecutive days must be >= 1");
    (0..flags.len())
        .map(|i| {
            if i + 1 < days {
                return None;
            }
            let window = &flags[i + 1 - days..=i];
            if window.iter().any(|f| f.is_none()) {
                return None;
            }
            Some(window.iter().all(|f| *f == Some(true)))
        })
        .collect()
}

/// Indicator wrapper around [`consecutive`] with a named predicate.
#[derive(Clone)]
pub struct Consecutive {
    name: String,
    days: usize,
    predicate_lookback: usize,
    predicate: Arc<BarPredicate>,
}

impl Consecutive {
    /// `predicate_lookback` is the number of leading bars on which the
    /// predicate itself is undefined.
    pub fn new<F>(name: impl Into<String>, days: usize, predicate_lookback: usize, predicate: F) -> Self
    where
        F: Fn(&[Bar], usize) -> Option<bool> + Send + Sync + 'static,
    {
        assert!(days >= 1, "consecutive days must be >= 1");
        Self {
            name: name.into(),
            days,
            predicate_lookback,
            predicate: Arc::new(predicate),
        }
    }
}

impl fmt::Debug for Consecutive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consecutive")
            .field("name", &self.name)
            .field("days", &self.days)
            .field("predicate_lookback", &self.predicate_lookback)
            .finish_non_exhaustive()
    }
}

impl Indicator for Consecutive {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.predicate_lookback.saturating_add(self.days - 1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let flags: Vec<Option<bool>> = (0..bars.len()).map(|i| (self.predicate)(bars, i)).collect();
        consecutive(&flags, self.days)
            .into_iter()
            .map(|f| match f {
                Some(true) => 1.0,
                Some(false) => 0.0,
                None => f64::NAN,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn all_days_must_hold() {
        let flags = [Some(true), Some(false), Some(true), Some(true), Some(true)];
        let out = consecutive(&flags, 2);
        assert_eq!(out, vec![None, Some(false), Some(false), Some(true), Some(true)]);
    }

    #[test]
    fn single_day_passes_through() {
        let flags = [Some(true), Some(false)];
        assert_eq!(consecutive(&flags, 1), vec![Some(true), Some(false)]);
    }

    #[test]
    fn undefined_flag_makes_window_undefined() {
        let flags = [None, Some(true), Some(true)];
        assert_eq!(consecutive(&flags, 2), vec![None, None, Some(true)]);
    }

    #[test]
    fn indicator_applies_predicate_per_bar() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 11.5, 12.5, 13.0]);
        let rising = Consecutive::new("rising_2", 2, 1, |bars: &[Bar], i: usize| {
            (i >= 1).then(|| bars[i].close > bars[i - 1].close)
        });
        assert_eq!(rising.lookback(), 2);
        let out = rising.compute(&bars);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert_eq!(out[2], 1.0);
        assert_eq!(out[3], 0.0);
        assert_eq!(out[4], 0.0);
        assert_eq!(out[5], 1.0);
    }

    #[test]
    fn huge_window_saturates_instead_of_overflowing() {
        let streak = Consecutive::new("always", usize::MAX, 4, |_: &[Bar], _| Some(true));
        assert_eq!(streak.lookback(), usize::MAX);
        assert_eq!(streak.required_bars(), usize::MAX);
        assert!(streak.compute(&make_bars(&[1.0, 2.0])).iter().all(|v| v.is_nan()));
    }
}
