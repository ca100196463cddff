//! Concrete rule scenarios, built bar by bar.
//!
//! Each fixture is written so the condition under test sits right at the
//! last bar, the way a daily screen sees it.

use chrono::NaiveDate;
use screenlab_core::components::rule::{GoldenPit, Outcome, Rule, TrendBreakout, Verdict};
use screenlab_core::config::RuleConfig;
use screenlab_core::domain::{Bar, BarSeries};
use screenlab_core::indicators::precompute;
use screenlab_core::registry::{composite_score, RuleRegistry};

const BASE_VOLUME: u64 = 1_000_000;

fn bar(i: usize, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Bar {
    Bar {
        date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap() + chrono::Duration::days(i as i64),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Volume that gives a 5-bar volume ratio of `ratio` after four bars of
/// `BASE_VOLUME`: x / ((4V + x) / 5) = r  =>  x = 4rV / (5 - r).
fn volume_for_ratio(ratio: f64) -> u64 {
    (4.0 * ratio * BASE_VOLUME as f64 / (5.0 - ratio)).round() as u64
}

/// 90 bars: rise to a peak close of 100 at bar 54, slide to 78 by bar 84
/// (22% below the peak), a +6% reversal candle at bar 85 on the given
/// volume ratio, then four +1% days that lift the close over its MA10.
fn golden_pit_series(reversal_volume_ratio: f64) -> BarSeries {
    let mut closes = Vec::with_capacity(90);
    for i in 0..=54 {
        closes.push(80.0 + 20.0 * i as f64 / 54.0);
    }
    for i in 55..=84 {
        closes.push(100.0 - 22.0 * (i - 54) as f64 / 30.0);
    }
    closes.push(78.0 * 1.06);
    for _ in 86..90 {
        let prev = *closes.last().unwrap();
        closes.push(prev * 1.01);
    }

    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let volume = if i == 85 {
                volume_for_ratio(reversal_volume_ratio)
            } else {
                BASE_VOLUME
            };
            bar(i, open, open.max(close) + 0.5, open.min(close) - 0.5, close, volume)
        })
        .collect();
    BarSeries::new("600000", bars).unwrap()
}

/// 260 bars of a steady uptrend, then two wide-range, high-volume bullish
/// candles; the last closes 0.8% above the prior 240-bar high.
fn trend_breakout_series() -> BarSeries {
    let mut bars = Vec::with_capacity(260);
    for i in 0..258 {
        let close = 100.0 + 0.2 * i as f64;
        let open = if i == 0 { close } else { close - 0.2 };
        bars.push(bar(i, open, close + 0.5, open - 0.5, close, BASE_VOLUME));
    }
    let prev_close = bars[257].close;
    bars.push(bar(258, prev_close, 161.0, 150.0, prev_close * 1.04, 3 * BASE_VOLUME));
    bars.push(bar(259, 157.5, 164.0, 152.0, 161.0 * 1.008, 5 * BASE_VOLUME));
    BarSeries::new("300750", bars).unwrap()
}

fn evaluate(rule: &dyn Rule, series: &BarSeries, config: &RuleConfig) -> Verdict {
    let indicators = precompute(series, &rule.required_indicators(config));
    rule.evaluate(series, &indicators, config)
}

#[test]
fn golden_pit_passes_on_deep_drawdown_reversal() {
    let series = golden_pit_series(1.8);
    let verdict = evaluate(&GoldenPit::default(), &series, &RuleConfig::default());

    assert_eq!(verdict.outcome, Outcome::Pass, "{verdict:#?}");
    assert!(verdict.score >= 60.0, "score {}", verdict.score);
    assert!(verdict.confidence > 0.5, "confidence {}", verdict.confidence);
    assert!(verdict.conditions["deepDrawdown"].met);
    assert!(verdict.conditions["reversalConfirmed"].met);
    assert!(verdict.conditions["aboveMA10"].met);
    // The reversal date is recorded in the explanation.
    let reversal_date = series.bars()[85].date.to_string();
    assert!(verdict.conditions["reversalConfirmed"].detail.contains(&reversal_date));
    assert_eq!(verdict.evaluated_at, series.last_date());
    assert_eq!(verdict.symbol, "600000");
}

#[test]
fn golden_pit_is_partial_without_volume_confirmation() {
    let series = golden_pit_series(1.2);
    let verdict = evaluate(&GoldenPit::default(), &series, &RuleConfig::default());

    assert_eq!(verdict.outcome, Outcome::Partial, "{verdict:#?}");
    assert!(verdict.conditions["deepDrawdown"].met);
    assert!(!verdict.conditions["reversalConfirmed"].met);
    assert!(verdict.conditions["aboveMA10"].met);
    assert_eq!(verdict.met_count(), 2);
}

#[test]
fn golden_pit_respects_a_stricter_drawdown_threshold() {
    let series = golden_pit_series(1.8);
    let config = RuleConfig::default().with_param("drawdown_threshold", 0.30);
    let verdict = evaluate(&GoldenPit::default(), &series, &config);
    assert!(!verdict.conditions["deepDrawdown"].met);
    assert_eq!(verdict.outcome, Outcome::Partial);
}

#[test]
fn trend_breakout_passes_on_confirmed_breakout() {
    let series = trend_breakout_series();
    let verdict = evaluate(&TrendBreakout::default(), &series, &RuleConfig::default());

    assert_eq!(verdict.outcome, Outcome::Pass, "{verdict:#?}");
    for name in ["bullishTrend", "sustainedVolume", "amplitudeBreakout", "breakoutConfirmed"] {
        assert!(verdict.conditions[name].met, "{name} not met");
    }
    // 0.8% breakout earns a bonus above the 65 floor, well short of 100.
    assert!(verdict.score > 65.0 && verdict.score < 80.0, "score {}", verdict.score);
    assert!(verdict.confidence > 0.5);
}

#[test]
fn trend_breakout_needs_the_volume_on_every_day() {
    let mut bars = trend_breakout_series().bars().to_vec();
    // Second-to-last bar back to normal volume: the last bar alone surges.
    bars[258].volume = BASE_VOLUME;
    let series = BarSeries::new("300750", bars).unwrap();
    let verdict = evaluate(&TrendBreakout::default(), &series, &RuleConfig::default());

    assert!(!verdict.conditions["sustainedVolume"].met);
    assert_eq!(verdict.outcome, Outcome::Partial);
    assert!(verdict.score < 65.0);
}

#[test]
fn short_series_is_an_error_naming_the_window() {
    let bars: Vec<Bar> = (0..10)
        .map(|i| bar(i, 10.0, 10.5, 9.5, 10.0, BASE_VOLUME))
        .collect();
    let series = BarSeries::new("000001", bars).unwrap();
    let verdict = evaluate(&TrendBreakout::default(), &series, &RuleConfig::default());

    assert_eq!(verdict.outcome, Outcome::Error);
    assert_eq!(verdict.score, 0.0);
    let reason = verdict.error_reason().unwrap();
    assert!(reason.contains("prior_high_240"), "{reason}");
    assert!(reason.contains("series has 10"), "{reason}");
}

#[test]
fn repeated_evaluation_is_bit_identical() {
    let series = golden_pit_series(1.8);
    let config = RuleConfig::default();
    for rule in [&GoldenPit::default() as &dyn Rule, &TrendBreakout::default()] {
        let first = evaluate(rule, &series, &config);
        let indicators = precompute(&series, &rule.required_indicators(&config));
        let second = rule.evaluate(&series, &indicators, &config);
        let third = rule.evaluate(&series, &indicators, &config);
        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(first.score.to_bits(), third.score.to_bits());
        assert_eq!(first.confidence.to_bits(), third.confidence.to_bits());
    }
}

#[test]
fn composite_of_weighted_scores() {
    let series = golden_pit_series(1.8);
    let mut low = evaluate(&GoldenPit::default(), &series, &RuleConfig::default());
    let mut high = low.clone();
    low.score = 60.0;
    high.score = 90.0;

    assert_eq!(composite_score([(1.0, &low), (2.0, &high)]), Some(80.0));
}

#[test]
fn default_registry_ranks_both_fixtures() {
    let registry = RuleRegistry::with_defaults();
    let pit = registry.evaluate_all(&golden_pit_series(1.8), &["sma_20"], 0.0);
    let breakout = registry.evaluate_all(&trend_breakout_series(), &["sma_20"], 0.0);

    // 90 bars are too few for TrendBreakout: one ERROR, composite from GoldenPit alone.
    assert_eq!(pit.error_count, 1);
    assert_eq!(
        pit.composite_score,
        pit.verdict("golden_pit").map(|v| v.score)
    );
    assert_eq!(breakout.error_count, 0);
    assert!(breakout.verdict("trend_breakout").unwrap().outcome == Outcome::Pass);
    assert!(pit.snapshot.contains_key("sma_20"));
}
