//! Rule Registry & Composite Scorer.
//!
//! The registry is an explicit value built by the caller and shared by
//! reference with every scan worker. Registration validates each config
//! eagerly; after that the registry is read-only apart from its per-rule
//! counters, which are atomics so concurrent evaluations never contend on a
//! lock.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::components::factory::{required_indicators, RuleKind};
use crate::components::indicator::Indicator;
use crate::components::rule::{Outcome, Rule, Verdict};
use crate::config::{ConfigError, RuleConfig};
use crate::domain::BarSeries;
use crate::fingerprint::ConfigHash;
use crate::indicators::{parse_indicator, precompute, IndicatorError};

// ─── Composite result ────────────────────────────────────────────────

/// Bar count and date range of the series a composite was computed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInfo {
    pub bars: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

/// All enabled rules' verdicts for one symbol, combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    pub symbol: String,
    /// In registration order.
    pub verdicts: Vec<Verdict>,
    /// Weighted mean of non-ERROR scores; `None` when every verdict is ERROR
    /// or no rule is enabled.
    pub composite_score: Option<f64>,
    pub passed: bool,
    pub pass_count: usize,
    pub partial_count: usize,
    pub fail_count: usize,
    pub error_count: usize,
    /// Share of verdicts that are PASS.
    pub pass_rate: f64,
    /// Latest values of caller-requested indicators that are defined.
    pub snapshot: BTreeMap<String, f64>,
    pub data_info: DataInfo,
}

impl CompositeResult {
    pub fn verdict(&self, rule_name: &str) -> Option<&Verdict> {
        self.verdicts.iter().find(|v| v.rule_name == rule_name)
    }

    /// Human-readable reason when no composite score exists.
    pub fn failure_reason(&self) -> Option<String> {
        if self.composite_score.is_some() {
            return None;
        }
        if self.verdicts.is_empty() {
            return Some("no enabled rules".to_string());
        }
        let reasons: Vec<String> = self
            .verdicts
            .iter()
            .map(|v| format!("{}: {}", v.rule_name, v.error_reason().unwrap_or("error")))
            .collect();
        Some(format!("all rules errored ({})", reasons.join("; ")))
    }
}

/// Weight-normalized mean of the non-ERROR scores.
pub fn composite_score<'a>(weighted: impl IntoIterator<Item = (f64, &'a Verdict)>) -> Option<f64> {
    let (sum, total_weight) = weighted
        .into_iter()
        .filter(|(_, v)| !v.is_error())
        .fold((0.0, 0.0), |(sum, w), (weight, v)| (sum + weight * v.score, w + weight));
    (total_weight > 0.0).then(|| sum / total_weight)
}

// ─── Per-rule statistics ─────────────────────────────────────────────

#[derive(Debug, Default)]
struct RuleCounters {
    evaluations: AtomicU64,
    passes: AtomicU64,
    partials: AtomicU64,
    fails: AtomicU64,
    errors: AtomicU64,
}

impl RuleCounters {
    fn record(&self, outcome: Outcome) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        let slot = match outcome {
            Outcome::Pass => &self.passes,
            Outcome::Partial => &self.partials,
            Outcome::Fail => &self.fails,
            Outcome::Error => &self.errors,
        };
        slot.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RuleStats {
        RuleStats {
            evaluations: self.evaluations.load(Ordering::Relaxed),
            passes: self.passes.load(Ordering::Relaxed),
            partials: self.partials.load(Ordering::Relaxed),
            fails: self.fails.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of one rule's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStats {
    pub evaluations: u64,
    pub passes: u64,
    pub partials: u64,
    pub fails: u64,
    pub errors: u64,
}

impl RuleStats {
    pub fn success_rate(&self) -> f64 {
        if self.evaluations == 0 {
            0.0
        } else {
            self.passes as f64 / self.evaluations as f64
        }
    }
}

// ─── Registry ────────────────────────────────────────────────────────

struct Entry {
    rule: Box<dyn Rule>,
    config: RuleConfig,
    counters: RuleCounters,
}

/// Identifier → (rule, config), in registration order.
#[derive(Default)]
pub struct RuleRegistry {
    entries: Vec<Entry>,
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (e.rule.name(), e.rule.kind(), &e.config)))
            .finish()
    }
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in rule under its kind name, with default configuration.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in RuleKind::ALL {
            // Default configs always validate and kind names are distinct.
            let _ = registry.register_kind(kind.as_str(), kind.as_str(), RuleConfig::default());
        }
        registry
    }

    /// Register a rule under its `name()`.
    ///
    /// Fails with `DuplicateRule` if the identifier is taken and with
    /// `InvalidConfig` if the config does not pass the rule's schema.
    pub fn register(&mut self, rule: Box<dyn Rule>, config: RuleConfig) -> Result<(), ConfigError> {
        let id = rule.name().to_string();
        if self.entries.iter().any(|e| e.rule.name() == id) {
            return Err(ConfigError::DuplicateRule(id));
        }
        rule.validate(&config)
            .map_err(|reason| ConfigError::InvalidConfig {
                rule: id.clone(),
                reason,
            })?;
        info!(rule = %id, kind = rule.kind(), enabled = config.enabled, weight = config.weight, "registered rule");
        self.entries.push(Entry {
            rule,
            config,
            counters: RuleCounters::default(),
        });
        Ok(())
    }

    /// Register a built-in rule by kind tag.
    pub fn register_kind(&mut self, id: &str, kind: &str, config: RuleConfig) -> Result<(), ConfigError> {
        let kind: RuleKind = kind.parse()?;
        self.register(kind.create(id), config)
    }

    /// Build a registry from `(identifier, kind, config)` entries.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, S, RuleConfig)>,
        S: AsRef<str>,
    {
        let mut registry = Self::new();
        for (id, kind, config) in entries {
            registry.register_kind(id.as_ref(), kind.as_ref(), config)?;
        }
        Ok(registry)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.rule.name() != id);
        before != self.entries.len()
    }

    pub fn get(&self, id: &str) -> Option<(&dyn Rule, &RuleConfig)> {
        self.entries
            .iter()
            .find(|e| e.rule.name() == id)
            .map(|e| (e.rule.as_ref(), &e.config))
    }

    /// All identifiers, in registration order.
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.rule.name()).collect()
    }

    /// Enabled rules with their configs, in registration order.
    pub fn enabled(&self) -> impl Iterator<Item = (&dyn Rule, &RuleConfig)> {
        self.entries
            .iter()
            .filter(|e| e.config.enabled)
            .map(|e| (e.rule.as_ref(), &e.config))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fingerprint(&self) -> ConfigHash {
        ConfigHash::of_rules(
            self.entries
                .iter()
                .map(|e| (e.rule.name(), e.rule.kind(), &e.config)),
        )
    }

    /// Counters per identifier, in registration order.
    pub fn stats(&self) -> Vec<(String, RuleStats)> {
        self.entries
            .iter()
            .map(|e| (e.rule.name().to_string(), e.counters.snapshot()))
            .collect()
    }

    /// Check caller-requested indicator names before a scan starts.
    pub fn parse_indicator_names<S: AsRef<str>>(
        names: &[S],
    ) -> Result<Vec<Box<dyn Indicator>>, IndicatorError> {
        names.iter().map(|n| parse_indicator(n.as_ref())).collect()
    }

    /// Run every enabled rule against one series and combine the verdicts.
    ///
    /// Indicators are computed once for the union of what the enabled rules
    /// need plus `requested_indicators`; the latter are also reported in
    /// `snapshot`. Unknown indicator names are skipped.
    pub fn evaluate_all<S: AsRef<str>>(
        &self,
        series: &BarSeries,
        requested_indicators: &[S],
        min_score: f64,
    ) -> CompositeResult {
        let extra: Vec<Box<dyn Indicator>> = requested_indicators
            .iter()
            .filter_map(|name| match parse_indicator(name.as_ref()) {
                Ok(ind) => Some(ind),
                Err(err) => {
                    debug!(symbol = series.symbol(), error = %err, "skipping requested indicator");
                    None
                }
            })
            .collect();
        let snapshot_names: Vec<String> = extra.iter().map(|i| i.name().to_string()).collect();

        let enabled: Vec<&Entry> = self.entries.iter().filter(|e| e.config.enabled).collect();
        let indicators = required_indicators(
            enabled.iter().map(|e| (e.rule.as_ref(), &e.config)),
            extra,
        );
        let values = precompute(series, &indicators);

        let mut verdicts = Vec::with_capacity(enabled.len());
        let mut weights = Vec::with_capacity(enabled.len());
        for entry in &enabled {
            let verdict = entry.rule.evaluate(series, &values, &entry.config);
            debug!(
                symbol = series.symbol(),
                rule = entry.rule.name(),
                outcome = verdict.outcome.as_str(),
                score = verdict.score,
                "rule evaluated"
            );
            entry.counters.record(verdict.outcome);
            weights.push(entry.config.weight);
            verdicts.push(verdict);
        }

        let composite = composite_score(weights.iter().copied().zip(verdicts.iter()));
        let count = |o: Outcome| verdicts.iter().filter(|v| v.outcome == o).count();
        let pass_count = count(Outcome::Pass);
        let snapshot = snapshot_names
            .into_iter()
            .filter_map(|name| values.latest(&name).map(|v| (name, v)))
            .collect();

        CompositeResult {
            symbol: series.symbol().to_string(),
            composite_score: composite,
            passed: composite.is_some_and(|s| s >= min_score),
            pass_count,
            partial_count: count(Outcome::Partial),
            fail_count: count(Outcome::Fail),
            error_count: count(Outcome::Error),
            pass_rate: if verdicts.is_empty() {
                0.0
            } else {
                pass_count as f64 / verdicts.len() as f64
            },
            snapshot,
            data_info: DataInfo {
                bars: series.len(),
                first_date: series.first_date(),
                last_date: series.last_date(),
            },
            verdicts,
        }
    }
}
