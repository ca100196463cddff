//! Scan report — the one value a finished (or cancelled) scan produces.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use screenlab_core::{CompositeResult, Outcome};
use serde::{Deserialize, Serialize};

/// How a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanStatus {
    Completed,
    Cancelled,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Completed => "completed",
            ScanStatus::Cancelled => "cancelled",
        }
    }
}

/// Final outcome of a scan.
///
/// Every requested symbol lands in exactly one of `results`,
/// `below_threshold` or `errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub requested_symbols: Vec<String>,
    /// Composite score descending, then symbol ascending.
    pub results: Vec<CompositeResult>,
    /// Evaluated symbols whose composite score fell below `min_composite_score`.
    pub below_threshold: BTreeMap<String, f64>,
    /// Symbol → human-readable reason.
    pub errors: BTreeMap<String, String>,
    pub status: ScanStatus,
    pub min_composite_score: f64,
    /// BLAKE3 of the canonical rule configuration.
    pub config_hash: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Count of ranked results in one score range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBucket {
    pub label: String,
    pub count: usize,
}

/// Aggregate view of a report for console output and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub status: ScanStatus,
    pub requested: usize,
    pub ranked: usize,
    pub below_threshold: usize,
    pub errors: usize,
    pub score_buckets: Vec<ScoreBucket>,
    /// Rule id → number of ranked results where that rule passed.
    pub rule_passes: BTreeMap<String, usize>,
    pub elapsed_secs: f64,
    /// `(symbol, composite score)` of the best ranked results.
    pub top: Vec<(String, f64)>,
}

const BUCKETS: [(&str, f64); 5] = [
    ("90-100", 90.0),
    ("80-89", 80.0),
    ("70-79", 70.0),
    ("60-69", 60.0),
    ("<60", f64::NEG_INFINITY),
];

impl ScanReport {
    /// Every symbol the report accounts for, across all three collections.
    pub fn accounted_symbols(&self) -> BTreeSet<&str> {
        self.results
            .iter()
            .map(|r| r.symbol.as_str())
            .chain(self.below_threshold.keys().map(|s| s.as_str()))
            .chain(self.errors.keys().map(|s| s.as_str()))
            .collect()
    }

    /// True when every requested symbol is accounted for exactly once.
    pub fn is_complete(&self) -> bool {
        let accounted = self.results.len() + self.below_threshold.len() + self.errors.len();
        let requested: BTreeSet<&str> = self.requested_symbols.iter().map(|s| s.as_str()).collect();
        accounted == requested.len() && self.accounted_symbols() == requested
    }

    pub fn result(&self, symbol: &str) -> Option<&CompositeResult> {
        self.results.iter().find(|r| r.symbol == symbol)
    }

    pub fn elapsed_secs(&self) -> f64 {
        (self.completed_at - self.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    pub fn summary(&self, top_n: usize) -> ReportSummary {
        let mut counts = [0usize; BUCKETS.len()];
        let mut rule_passes: BTreeMap<String, usize> = BTreeMap::new();

        for result in &self.results {
            let score = result.composite_score.unwrap_or(f64::NEG_INFINITY);
            if let Some(i) = BUCKETS.iter().position(|(_, floor)| score >= *floor) {
                counts[i] += 1;
            }
            for verdict in &result.verdicts {
                let entry = rule_passes.entry(verdict.rule_name.clone()).or_default();
                if verdict.outcome == Outcome::Pass {
                    *entry += 1;
                }
            }
        }

        ReportSummary {
            status: self.status,
            requested: self.requested_symbols.len(),
            ranked: self.results.len(),
            below_threshold: self.below_threshold.len(),
            errors: self.errors.len(),
            score_buckets: BUCKETS
                .iter()
                .zip(counts)
                .map(|((label, _), count)| ScoreBucket {
                    label: label.to_string(),
                    count,
                })
                .collect(),
            rule_passes,
            elapsed_secs: self.elapsed_secs(),
            top: self
                .results
                .iter()
                .take(top_n)
                .filter_map(|r| r.composite_score.map(|s| (r.symbol.clone(), s)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use screenlab_core::registry::DataInfo;
    use screenlab_core::{Condition, Verdict};

    fn verdict(symbol: &str, rule: &str, outcome: Outcome, score: f64) -> Verdict {
        Verdict {
            symbol: symbol.into(),
            rule_name: rule.into(),
            outcome,
            score,
            confidence: 0.5,
            conditions: BTreeMap::from([("c".to_string(), Condition::new(true, "ok"))]),
            evaluated_at: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        }
    }

    fn composite(symbol: &str, score: f64, outcome: Outcome) -> CompositeResult {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        CompositeResult {
            symbol: symbol.into(),
            verdicts: vec![verdict(symbol, "golden_pit", outcome, score)],
            composite_score: Some(score),
            passed: true,
            pass_count: usize::from(outcome == Outcome::Pass),
            partial_count: 0,
            fail_count: 0,
            error_count: 0,
            pass_rate: 1.0,
            snapshot: BTreeMap::new(),
            data_info: DataInfo {
                bars: 100,
                first_date: date,
                last_date: date,
            },
        }
    }

    fn report() -> ScanReport {
        let started = Utc::now();
        ScanReport {
            requested_symbols: ["AAA", "BBB", "CCC", "DDD", "EEE"]
                .into_iter()
                .map(String::from)
                .collect(),
            results: vec![
                composite("BBB", 95.0, Outcome::Pass),
                composite("AAA", 82.0, Outcome::Pass),
                composite("CCC", 64.0, Outcome::Partial),
            ],
            below_threshold: BTreeMap::from([("DDD".to_string(), 30.0)]),
            errors: BTreeMap::from([("EEE".to_string(), "fetch failed".to_string())]),
            status: ScanStatus::Completed,
            min_composite_score: 60.0,
            config_hash: "abc".into(),
            started_at: started,
            completed_at: started + chrono::Duration::milliseconds(1500),
        }
    }

    #[test]
    fn complete_report_accounts_for_every_symbol() {
        let report = report();
        assert!(report.is_complete());
        assert_eq!(report.accounted_symbols().len(), 5);
    }

    #[test]
    fn missing_symbol_is_incomplete() {
        let mut report = report();
        report.errors.clear();
        assert!(!report.is_complete());
    }

    #[test]
    fn duplicated_symbol_is_incomplete() {
        let mut report = report();
        report.errors.clear();
        report.errors.insert("AAA".into(), "dup".into());
        assert!(!report.is_complete());
    }

    #[test]
    fn summary_buckets_and_top() {
        let summary = report().summary(2);
        let counts: Vec<usize> = summary.score_buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 0, 1, 0]);
        assert_eq!(summary.ranked, 3);
        assert_eq!(summary.below_threshold, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.top, vec![("BBB".to_string(), 95.0), ("AAA".to_string(), 82.0)]);
        assert_eq!(summary.rule_passes.get("golden_pit"), Some(&2));
        assert!((summary.elapsed_secs - 1.5).abs() < 1e-9);
    }

    #[test]
    fn report_json_roundtrip() {
        let report = report();
        let json = serde_json::to_string(&report).unwrap();
        let back: ScanReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
