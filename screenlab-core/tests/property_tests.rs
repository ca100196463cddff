//! Property tests for rule and registry invariants.
//!
//! Uses proptest to verify:
//! 1. Window guard — any series shorter than a rule's required history
//!    yields an ERROR verdict, never a score
//! 2. Range — scores stay in [0, 100] and confidence in [0, 1] on random walks
//! 3. Composite bounds — a composite lies between its lowest and highest
//!    non-ERROR score

use chrono::NaiveDate;
use proptest::prelude::*;
use screenlab_core::components::rule::{GoldenPit, Outcome, Rule, TrendBreakout};
use screenlab_core::config::RuleConfig;
use screenlab_core::domain::{Bar, BarSeries};
use screenlab_core::indicators::precompute;
use screenlab_core::registry::RuleRegistry;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Random walk of daily (return, range, volume) triples.
fn arb_walk(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<(f64, f64, u64)>> {
    prop::collection::vec(
        (-0.08f64..0.08, 0.0f64..0.06, 100_000u64..5_000_000),
        min_len..max_len,
    )
}

fn series_from_walk(walk: &[(f64, f64, u64)]) -> BarSeries {
    let base = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let mut price = 50.0;
    let bars = walk
        .iter()
        .enumerate()
        .map(|(i, &(ret, range, volume))| {
            let open = price;
            let close = (price * (1.0 + ret)).max(1.0);
            price = close;
            Bar {
                date: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) * (1.0 + range / 2.0),
                low: open.min(close) * (1.0 - range / 2.0),
                close,
                volume,
            }
        })
        .collect();
    BarSeries::new("PROP", bars).unwrap()
}

fn rules() -> Vec<Box<dyn Rule>> {
    vec![Box::new(GoldenPit::default()), Box::new(TrendBreakout::default())]
}

// ── 1. Window guard ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn short_series_always_error(walk in arb_walk(1, 241)) {
        let series = series_from_walk(&walk);
        let config = RuleConfig::default();
        for rule in rules() {
            if series.len() >= rule.required_bars(&config) {
                continue;
            }
            let indicators = precompute(&series, &rule.required_indicators(&config));
            let verdict = rule.evaluate(&series, &indicators, &config);
            prop_assert_eq!(verdict.outcome, Outcome::Error);
            prop_assert_eq!(verdict.score, 0.0);
            prop_assert!(verdict.error_reason().unwrap().contains("insufficient history"));
        }
    }
}

// ── 2. Range ─────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn scores_and_confidence_stay_in_range(walk in arb_walk(241, 320)) {
        let series = series_from_walk(&walk);
        let config = RuleConfig::default();
        for rule in rules() {
            let indicators = precompute(&series, &rule.required_indicators(&config));
            let verdict = rule.evaluate(&series, &indicators, &config);
            prop_assert!(verdict.outcome != Outcome::Error, "{:?}", verdict.error_reason());
            prop_assert!((0.0..=100.0).contains(&verdict.score));
            prop_assert!((0.0..=1.0).contains(&verdict.confidence));
            let expected = Outcome::from_met(verdict.met_count(), verdict.conditions.len());
            prop_assert_eq!(verdict.outcome, expected);
        }
    }
}

// ── 3. Composite bounds ──────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn composite_lies_between_rule_scores(
        walk in arb_walk(61, 300),
        w1 in 0.1f64..5.0,
        w2 in 0.1f64..5.0,
    ) {
        let registry = RuleRegistry::from_entries([
            ("pit", "golden_pit", RuleConfig::default().with_weight(w1)),
            ("breakout", "trend_breakout", RuleConfig::default().with_weight(w2)),
        ]).unwrap();
        let series = series_from_walk(&walk);
        let result = registry.evaluate_all(&series, &[] as &[&str], 60.0);

        let scores: Vec<f64> = result
            .verdicts
            .iter()
            .filter(|v| v.outcome != Outcome::Error)
            .map(|v| v.score)
            .collect();
        match result.composite_score {
            None => prop_assert!(scores.is_empty()),
            Some(c) => {
                let lo = scores.iter().copied().fold(f64::INFINITY, f64::min);
                let hi = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(c >= lo - 1e-9 && c <= hi + 1e-9, "{} outside [{}, {}]", c, lo, hi);
                prop_assert_eq!(result.passed, c >= 60.0);
            }
        }
        prop_assert_eq!(
            result.pass_count + result.partial_count + result.fail_count + result.error_count,
            result.verdicts.len()
        );
    }
}
