//! Property tests for scan reports: completeness and monotonic ranking hold
//! for any mix of good series, short series, failures and thresholds.

use proptest::prelude::*;

use chrono::NaiveDate;
use screenlab_core::{BarSeries, RuleRegistry};
use screenlab_runner::synthetic::generate_synthetic_bars;
use screenlab_runner::{run_scan, MemoryProvider, ScanControl, ScanRequest};

#[derive(Debug, Clone)]
enum Source {
    Bars(usize),
    Failure,
    Missing,
}

fn arb_source() -> impl Strategy<Value = Source> {
    prop_oneof![
        6 => (30usize..320).prop_map(Source::Bars),
        1 => Just(Source::Failure),
        1 => Just(Source::Missing),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn reports_are_complete_and_ranked(
        sources in prop::collection::vec(arb_source(), 1..9),
        min_score in 0.0f64..90.0,
        workers in 1usize..5,
    ) {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let mut provider = MemoryProvider::new();
        let mut symbols = Vec::new();
        for (i, source) in sources.iter().enumerate() {
            let symbol = format!("S{i:02}");
            match source {
                Source::Bars(n) => {
                    let bars = generate_synthetic_bars(&symbol, start, *n);
                    provider.insert(BarSeries::new(symbol.as_str(), bars).unwrap());
                }
                Source::Failure => provider = provider.with_failure(symbol.as_str(), "down"),
                Source::Missing => {}
            }
            symbols.push(symbol);
        }

        let registry = RuleRegistry::with_defaults();
        let request = ScanRequest::new(symbols.iter().cloned())
            .with_min_score(min_score)
            .with_concurrency(workers);
        let report = run_scan(&registry, &provider, &request, &ScanControl::new(), None).unwrap();

        // Completeness: each symbol in exactly one collection.
        prop_assert!(report.is_complete());
        prop_assert_eq!(
            report.results.len() + report.below_threshold.len() + report.errors.len(),
            symbols.len()
        );

        // Ranked results clear the threshold and are sorted.
        for r in &report.results {
            prop_assert!(r.composite_score.unwrap() >= min_score);
        }
        for s in report.below_threshold.values() {
            prop_assert!(*s < min_score);
        }
        for pair in report.results.windows(2) {
            let (a, b) = (pair[0].composite_score.unwrap(), pair[1].composite_score.unwrap());
            prop_assert!(a > b || (a == b && pair[0].symbol < pair[1].symbol));
        }

        // Failures and missing symbols never produce a score.
        for (i, source) in sources.iter().enumerate() {
            let symbol = format!("S{i:02}");
            if matches!(source, Source::Failure | Source::Missing) {
                prop_assert!(report.errors.contains_key(&symbol));
            }
        }
    }
}
