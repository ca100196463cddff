//! TrendBreakout — an established uptrend breaking above its long-term high
//! on consecutive high-volume, wide-range bullish candles.
//!
//! Conditions, all evaluated at the last bar:
//! - `bullishTrend`: MA5 > MA10 > MA20 > MA60 and close > MA5.
//! - `sustainedVolume`: volume ratio >= `volume_ratio_threshold` on each of
//!   the last `consecutive_days` bars.
//! - `amplitudeBreakout`: amplitude >= `amplitude_threshold` on a bullish
//!   candle, on each of the last `consecutive_days` bars.
//! - `breakoutConfirmed`: close above the highest high of the
//!   `high_lookback` bars before the last one.
//!
//! A PASS scores from `min_score` upward with breakout strength; anything
//! else scores a share of `min_score` proportional to the conditions met.

use std::collections::BTreeMap;

use crate::components::indicator::{Indicator, IndicatorValues};
use crate::config::{ParamDef, ParamKind, ParamSchema, RuleConfig};
use crate::domain::{Bar, BarSeries};
use crate::indicators::{Amplitude, BullishAlignment, Consecutive, RollingHigh, VolumeRatio};

use super::{check_history, confidence, missing_indicator, Condition, Outcome, Rule, Verdict};

const VOLUME_PERIOD: usize = 5;

/// Breakout strength that earns the full bonus above the pass floor.
const FULL_STRENGTH: f64 = 0.05;

pub static TREND_BREAKOUT_SCHEMA: ParamSchema = ParamSchema {
    params: &[
        ParamDef::new("volume_ratio_threshold", 2.0, ParamKind::Positive),
        ParamDef::new("consecutive_days", 2.0, ParamKind::Window),
        ParamDef::new("amplitude_threshold", 0.07, ParamKind::Fraction),
        ParamDef::new("high_lookback", 240.0, ParamKind::Window),
    ],
    thresholds: &[ParamDef::new("min_score", 65.0, ParamKind::Score)],
};

#[derive(Debug, Clone, Copy)]
struct Params {
    volume_ratio_threshold: f64,
    consecutive_days: usize,
    amplitude_threshold: f64,
    high_lookback: usize,
    min_score: f64,
}

impl Params {
    fn resolve(config: &RuleConfig) -> Result<Self, String> {
        let s = &TREND_BREAKOUT_SCHEMA;
        s.validate(config)?;
        Ok(Self {
            volume_ratio_threshold: s.param(config, "volume_ratio_threshold"),
            consecutive_days: s.window(config, "consecutive_days"),
            amplitude_threshold: s.param(config, "amplitude_threshold"),
            high_lookback: s.window(config, "high_lookback"),
            min_score: s.threshold(config, "min_score"),
        })
    }

    fn defaults() -> Self {
        Self {
            volume_ratio_threshold: 2.0,
            consecutive_days: 2,
            amplitude_threshold: 0.07,
            high_lookback: 240,
            min_score: 65.0,
        }
    }

    fn volume_streak(&self) -> Consecutive {
        let threshold = self.volume_ratio_threshold;
        let ratio = VolumeRatio::new(VOLUME_PERIOD);
        Consecutive::new(
            format!("volume_streak_{}_{}", threshold, self.consecutive_days),
            self.consecutive_days,
            VOLUME_PERIOD - 1,
            move |bars: &[Bar], i: usize| ratio.value_at(bars, i).map(|r| r >= threshold),
        )
    }

    fn amplitude_streak(&self) -> Consecutive {
        let threshold = self.amplitude_threshold;
        Consecutive::new(
            format!("bullish_amplitude_streak_{}_{}", threshold, self.consecutive_days),
            self.consecutive_days,
            1,
            move |bars: &[Bar], i: usize| {
                Amplitude::value_at(bars, i).map(|a| a >= threshold && bars[i].is_bullish())
            },
        )
    }

    fn prior_high(&self) -> RollingHigh {
        RollingHigh::prior(self.high_lookback)
    }
}

#[derive(Debug, Clone)]
pub struct TrendBreakout {
    name: String,
}

impl TrendBreakout {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for TrendBreakout {
    fn default() -> Self {
        Self::new("trend_breakout")
    }
}

impl Rule for TrendBreakout {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "trend_breakout"
    }

    fn description(&self) -> &'static str {
        "Established uptrend (MA5 > MA10 > MA20 > MA60, close above MA5) closing above \
         its prior 240-bar high, with the last 2 bars each on >= 2x volume and a >= 7% \
         bullish range."
    }

    fn schema(&self) -> &'static ParamSchema {
        &TREND_BREAKOUT_SCHEMA
    }

    fn required_indicators(&self, config: &RuleConfig) -> Vec<Box<dyn Indicator>> {
        let p = Params::resolve(config).unwrap_or_else(|_| Params::defaults());
        vec![
            Box::new(BullishAlignment::default()),
            Box::new(p.volume_streak()),
            Box::new(p.amplitude_streak()),
            Box::new(p.prior_high()),
            Box::new(VolumeRatio::new(VOLUME_PERIOD)),
            Box::new(Amplitude),
        ]
    }

    fn evaluate(
        &self,
        series: &BarSeries,
        indicators: &IndicatorValues,
        config: &RuleConfig,
    ) -> Verdict {
        let p = match Params::resolve(config) {
            Ok(p) => p,
            Err(reason) => {
                return Verdict::error(series, &self.name, format!("malformed parameter: {reason}"))
            }
        };
        if let Err(detail) = check_history(series, &self.history_windows(config)) {
            return Verdict::error(series, &self.name, detail);
        }

        let last = series.last_index();
        let close = series.last().close;
        let vr_key = format!("volume_ratio_{VOLUME_PERIOD}");
        let volume_streak = p.volume_streak();
        let amplitude_streak = p.amplitude_streak();
        let prior_high = p.prior_high();

        let flags = [
            "bullish_alignment",
            volume_streak.name(),
            amplitude_streak.name(),
        ];
        let mut read = [false; 3];
        for (slot, key) in read.iter_mut().zip(flags) {
            match indicators.flag(key, last) {
                Some(v) => *slot = v,
                None => return missing_indicator(series, &self.name, key),
            }
        }
        let [trend, volume, amplitude] = read;
        let Some(peak) = indicators.value(prior_high.name(), last) else {
            return missing_indicator(series, &self.name, prior_high.name());
        };

        let days = p.consecutive_days;
        let recent = |key: &str| -> String {
            (last + 1 - days..=last)
                .map(|i| match indicators.value(key, i) {
                    Some(v) => format!("{v:.2}"),
                    None => "n/a".to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut conditions = BTreeMap::new();
        conditions.insert(
            "bullishTrend".to_string(),
            Condition::new(trend, "MA5 > MA10 > MA20 > MA60 with close above MA5"),
        );
        conditions.insert(
            "sustainedVolume".to_string(),
            Condition::new(
                volume,
                format!(
                    "volume ratio over last {days} bars [{}] vs threshold {:.2}",
                    recent(&vr_key),
                    p.volume_ratio_threshold
                ),
            ),
        );
        conditions.insert(
            "amplitudeBreakout".to_string(),
            Condition::new(
                amplitude,
                format!(
                    "amplitude over last {days} bars [{}] vs threshold {:.2}, bullish candles required",
                    recent("amplitude"),
                    p.amplitude_threshold
                ),
            ),
        );
        let strength = (close - peak) / peak;
        let breakout = close > peak;
        conditions.insert(
            "breakoutConfirmed".to_string(),
            Condition::new(
                breakout,
                format!(
                    "close {close:.2} vs prior {}-bar high {peak:.2} ({:+.2}%)",
                    p.high_lookback,
                    strength * 100.0
                ),
            ),
        );

        let met = conditions.values().filter(|c| c.met).count();
        let outcome = Outcome::from_met(met, conditions.len());
        let score = if outcome == Outcome::Pass {
            let bonus = (strength / FULL_STRENGTH).clamp(0.0, 1.0);
            p.min_score + (100.0 - p.min_score) * bonus
        } else {
            p.min_score * met as f64 / conditions.len() as f64
        };

        Verdict::new(
            series,
            &self.name,
            outcome,
            score,
            confidence(score, p.min_score),
            conditions,
        )
    }
}
