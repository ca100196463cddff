//! GoldenPit — deep drawdown from a prior peak, confirmed by a high-volume
//! reversal candle and a close back above the 10-day average.
//!
//! Conditions:
//! - `deepDrawdown`: the deepest close-to-prior-peak drawdown over the
//!   trailing `high_lookback` bars reaches `drawdown_threshold`.
//! - `reversalConfirmed`: some bar in the trailing `reversal_window` gains at
//!   least `yang_gain_threshold` on a volume ratio of at least
//!   `volume_ratio_threshold`.
//! - `aboveMA10`: the last close is above its 10-day average.

use std::collections::BTreeMap;

use crate::components::indicator::{Indicator, IndicatorValues};
use crate::config::{ParamDef, ParamKind, ParamSchema, RuleConfig};
use crate::domain::BarSeries;
use crate::indicators::{DailyReturn, Drawdown, Sma, VolumeRatio};

use super::{
    check_history, confidence, graded_score, missing_indicator, relative_excess, Condition,
    Outcome, Rule, Verdict,
};

const MA_PERIOD: usize = 10;
const VOLUME_PERIOD: usize = 5;

pub static GOLDEN_PIT_SCHEMA: ParamSchema = ParamSchema {
    params: &[
        ParamDef::new("high_lookback", 60.0, ParamKind::Window),
        ParamDef::new("drawdown_threshold", 0.20, ParamKind::Fraction),
        ParamDef::new("reversal_window", 5.0, ParamKind::Window),
        ParamDef::new("yang_gain_threshold", 0.05, ParamKind::Fraction),
        ParamDef::new("volume_ratio_threshold", 1.5, ParamKind::Positive),
    ],
    thresholds: &[ParamDef::new("min_score", 60.0, ParamKind::Score)],
};

#[derive(Debug, Clone, Copy)]
struct Params {
    high_lookback: usize,
    drawdown_threshold: f64,
    reversal_window: usize,
    yang_gain_threshold: f64,
    volume_ratio_threshold: f64,
    min_score: f64,
}

impl Params {
    fn resolve(config: &RuleConfig) -> Result<Self, String> {
        let s = &GOLDEN_PIT_SCHEMA;
        s.validate(config)?;
        Ok(Self {
            high_lookback: s.window(config, "high_lookback"),
            drawdown_threshold: s.param(config, "drawdown_threshold"),
            reversal_window: s.window(config, "reversal_window"),
            yang_gain_threshold: s.param(config, "yang_gain_threshold"),
            volume_ratio_threshold: s.param(config, "volume_ratio_threshold"),
            min_score: s.threshold(config, "min_score"),
        })
    }

    fn defaults() -> Self {
        Self {
            high_lookback: 60,
            drawdown_threshold: 0.20,
            reversal_window: 5,
            yang_gain_threshold: 0.05,
            volume_ratio_threshold: 1.5,
            min_score: 60.0,
        }
    }

    fn drawdown_key(&self) -> String {
        format!("prior_drawdown_{}", self.high_lookback)
    }
}

#[derive(Debug, Clone)]
pub struct GoldenPit {
    name: String,
}

impl GoldenPit {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for GoldenPit {
    fn default() -> Self {
        Self::new("golden_pit")
    }
}

impl Rule for GoldenPit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "golden_pit"
    }

    fn description(&self) -> &'static str {
        "Deep drawdown from the prior peak (default 20% over 60 bars), followed within \
         the last 5 bars by a big bullish candle (>= 5% gain on >= 1.5x volume) and a \
         close back above the 10-day moving average."
    }

    fn schema(&self) -> &'static ParamSchema {
        &GOLDEN_PIT_SCHEMA
    }

    fn required_indicators(&self, config: &RuleConfig) -> Vec<Box<dyn Indicator>> {
        let p = Params::resolve(config).unwrap_or_else(|_| Params::defaults());
        vec![
            Box::new(Drawdown::from_prior_high(p.high_lookback)),
            Box::new(Sma::new(MA_PERIOD)),
            Box::new(VolumeRatio::new(VOLUME_PERIOD)),
            Box::new(DailyReturn),
        ]
    }

    fn history_windows(&self, config: &RuleConfig) -> Vec<(String, usize)> {
        let p = Params::resolve(config).unwrap_or_else(|_| Params::defaults());
        vec![
            (p.drawdown_key(), p.high_lookback.saturating_add(1)),
            (format!("sma_{MA_PERIOD}"), MA_PERIOD),
            (
                format!(
                    "volume_ratio_{VOLUME_PERIOD} over reversal_window {}",
                    p.reversal_window
                ),
                (VOLUME_PERIOD - 1).saturating_add(p.reversal_window),
            ),
            (
                format!("daily_return over reversal_window {}", p.reversal_window),
                p.reversal_window.saturating_add(1),
            ),
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

        let bars = series.bars();
        let last = series.last_index();
        let mut conditions = BTreeMap::new();
        let mut sub_scores = [0.0; 3];

        // ── deepDrawdown ──
        let dd_key = p.drawdown_key();
        let Some(dd_series) = indicators.get_series(&dd_key) else {
            return missing_indicator(series, &self.name, &dd_key);
        };
        let window_start = (last + 1).saturating_sub(p.high_lookback);
        let deepest = (window_start..=last)
            .filter(|&i| !dd_series[i].is_nan())
            .min_by(|&a, &b| dd_series[a].total_cmp(&dd_series[b]));
        let Some(trough) = deepest else {
            return missing_indicator(series, &self.name, &dd_key);
        };
        let depth = -dd_series[trough];
        let met = depth >= p.drawdown_threshold;
        if met {
            sub_scores[0] = graded_score(relative_excess(depth, p.drawdown_threshold));
        }
        conditions.insert(
            "deepDrawdown".to_string(),
            Condition::new(
                met,
                format!(
                    "deepest drawdown {:.2}% on {} vs threshold {:.2}% (current {:.2}%)",
                    depth * 100.0,
                    bars[trough].date,
                    p.drawdown_threshold * 100.0,
                    -dd_series[last] * 100.0,
                ),
            ),
        );

        // ── reversalConfirmed ──
        let vr_key = format!("volume_ratio_{VOLUME_PERIOD}");
        let reversal_start = last + 1 - p.reversal_window;
        let mut big_yang: Option<(usize, f64, f64)> = None;
        for i in reversal_start..=last {
            let (Some(ret), Some(ratio)) = (
                indicators.value("daily_return", i),
                indicators.value(&vr_key, i),
            ) else {
                continue;
            };
            if ret >= p.yang_gain_threshold && ratio >= p.volume_ratio_threshold {
                big_yang = Some((i, ret, ratio));
            }
        }
        let detail = match big_yang {
            Some((i, ret, ratio)) => {
                let excess = (relative_excess(ret, p.yang_gain_threshold)
                    + relative_excess(ratio, p.volume_ratio_threshold))
                    / 2.0;
                sub_scores[1] = graded_score(excess);
                format!(
                    "big yang on {}: gain {:.2}% with volume ratio {:.2}",
                    bars[i].date,
                    ret * 100.0,
                    ratio
                )
            }
            None => format!(
                "no bar in the last {} with gain >= {:.2}% and volume ratio >= {:.2}",
                p.reversal_window,
                p.yang_gain_threshold * 100.0,
                p.volume_ratio_threshold
            ),
        };
        conditions.insert(
            "reversalConfirmed".to_string(),
            Condition::new(big_yang.is_some(), detail),
        );

        // ── aboveMA10 ──
        let ma_key = format!("sma_{MA_PERIOD}");
        let Some(ma) = indicators.value(&ma_key, last) else {
            return missing_indicator(series, &self.name, &ma_key);
        };
        let close = bars[last].close;
        let met = close > ma;
        if met {
            sub_scores[2] = graded_score((close - ma) / ma * 10.0);
        }
        conditions.insert(
            "aboveMA10".to_string(),
            Condition::new(met, format!("close {close:.2} vs MA10 {ma:.2}")),
        );

        let met_count = conditions.values().filter(|c| c.met).count();
        let score = sub_scores.iter().sum::<f64>() / sub_scores.len() as f64;
        Verdict::new(
            series,
            &self.name,
            Outcome::from_met(met_count, conditions.len()),
            score,
            confidence(score, p.min_score),
            conditions,
        )
    }
}
