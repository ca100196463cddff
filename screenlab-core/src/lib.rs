//! ScreenLab Core — indicators, screening rules, rule registry and composite scoring.
//!
//! This crate is pure computation over one instrument at a time:
//! - Domain types (bars, validated bar series)
//! - Indicator engine (moving averages, volume ratio, amplitude, rolling highs,
//!   drawdown, bullish alignment, consecutive conditions, momentum)
//! - Rule trait with the GoldenPit and TrendBreakout rules
//! - Rule configuration records with eager validation
//! - Rule registry with weighted composite scoring and per-rule statistics
//!
//! No I/O and no threads live here; scan orchestration is in `screenlab-runner`.

pub mod components;
pub mod config;
pub mod domain;
pub mod fingerprint;
pub mod indicators;
pub mod registry;

pub use components::{Condition, Outcome, Rule, RuleKind, Verdict};
pub use config::{ConfigError, RuleConfig};
pub use domain::{Bar, BarSeries, SeriesError};
pub use registry::{CompositeResult, RuleRegistry, RuleStats};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a scan worker touches is Send + Sync.
    ///
    /// The registry is shared by reference across the runner's worker pool;
    /// series, verdicts and composites cross thread boundaries by value.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::BarSeries>();
        require_sync::<domain::BarSeries>();

        // Component types
        require_send::<components::IndicatorValues>();
        require_sync::<components::IndicatorValues>();
        require_send::<components::Verdict>();
        require_sync::<components::Verdict>();
        require_send::<indicators::Consecutive>();
        require_sync::<indicators::Consecutive>();
        require_send::<components::rule::GoldenPit>();
        require_sync::<components::rule::GoldenPit>();
        require_send::<components::rule::TrendBreakout>();
        require_sync::<components::rule::TrendBreakout>();

        // Registry
        require_send::<registry::RuleRegistry>();
        require_sync::<registry::RuleRegistry>();
        require_send::<registry::CompositeResult>();
        require_sync::<registry::CompositeResult>();
        require_send::<config::RuleConfig>();
        require_sync::<config::RuleConfig>();
    }

    /// Architecture contract: `Rule::evaluate` sees one series, its
    /// indicators and its own config. No registry, no other symbols.
    #[test]
    fn rule_trait_sees_only_its_inputs() {
        fn _check_trait_object_builds(
            rule: &dyn Rule,
            series: &BarSeries,
            indicators: &components::IndicatorValues,
            config: &RuleConfig,
        ) -> Verdict {
            rule.evaluate(series, indicators, config)
        }
    }
}
