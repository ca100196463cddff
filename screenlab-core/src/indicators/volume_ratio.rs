//! Volume ratio — today's volume against the trailing average volume.
//!
//! ratio[t] = volume[t] / mean(volume[t-period+1..=t])
//! The window includes the current bar. Lookback: period - 1.
//! A window with zero average volume is undefined.

use super::rolling_mean;
use crate::components::indicator::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct VolumeRatio {
    period: usize,
    name: String,
}

impl VolumeRatio {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "volume ratio period must be >= 1");
        Self {
            period,
            name: format!("volume_ratio_{period}"),
        }
    }

    /// Ratio at a single index, for predicates evaluated bar by bar.
    pub fn value_at(&self, bars: &[Bar], i: usize) -> Option<f64> {
        if i + 1 < self.period || i >= bars.len() {
            return None;
        }
        let window = &bars[i + 1 - self.period..=i];
        let mean = window.iter().map(|b| b.volume as f64).sum::<f64>() / self.period as f64;
        if mean > 0.0 {
            Some(bars[i].volume as f64 / mean)
        } else {
            None
        }
    }
}

impl Indicator for VolumeRatio {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();
        let means = rolling_mean(&volumes, self.period);
        volumes
            .iter()
            .zip(means)
            .map(|(&v, mean)| if mean > 0.0 { v / mean } else { f64::NAN })
            .collect()
    }
}
