//! Report export and sinks — JSON, CSV and a plain-text console summary.
//!
//! A sink consumes one finished `ScanReport`. Serialization for display or
//! persistence lives here, not in the orchestrator.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::report::ScanReport;

// ─── JSON ────────────────────────────────────────────────────────────

pub fn export_json(report: &ScanReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize ScanReport to JSON")
}

pub fn import_json(json: &str) -> Result<ScanReport> {
    serde_json::from_str(json).context("failed to deserialize ScanReport from JSON")
}

// ─── CSV ─────────────────────────────────────────────────────────────

/// One row per ranked result, in rank order.
///
/// Columns: rank, symbol, composite_score, passed, pass_count,
/// partial_count, fail_count, error_count, bars, last_date, then one
/// `<rule>_outcome` and `<rule>_score` pair per rule seen in the report.
pub fn export_results_csv(report: &ScanReport) -> Result<String> {
    let mut rules: Vec<&str> = Vec::new();
    for result in &report.results {
        for verdict in &result.verdicts {
            if !rules.contains(&verdict.rule_name.as_str()) {
                rules.push(&verdict.rule_name);
            }
        }
    }

    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header: Vec<String> = [
        "rank",
        "symbol",
        "composite_score",
        "passed",
        "pass_count",
        "partial_count",
        "fail_count",
        "error_count",
        "bars",
        "last_date",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for rule in &rules {
        header.push(format!("{rule}_outcome"));
        header.push(format!("{rule}_score"));
    }
    wtr.write_record(&header)?;

    for (i, r) in report.results.iter().enumerate() {
        let mut row = vec![
            (i + 1).to_string(),
            r.symbol.clone(),
            r.composite_score
                .map(|s| format!("{s:.4}"))
                .unwrap_or_default(),
            r.passed.to_string(),
            r.pass_count.to_string(),
            r.partial_count.to_string(),
            r.fail_count.to_string(),
            r.error_count.to_string(),
            r.data_info.bars.to_string(),
            r.data_info.last_date.to_string(),
        ];
        for rule in &rules {
            match r.verdict(rule) {
                Some(v) => {
                    row.push(v.outcome.as_str().to_string());
                    row.push(format!("{:.4}", v.score));
                }
                None => {
                    row.push(String::new());
                    row.push(String::new());
                }
            }
        }
        wtr.write_record(&row)?;
    }

    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

// ─── Console summary ─────────────────────────────────────────────────

/// Plain-text summary: totals, score distribution, top results, errors.
pub fn render_summary(report: &ScanReport, top_n: usize) -> String {
    let summary = report.summary(top_n);
    let mut out = String::with_capacity(1024);

    out.push_str(&format!(
        "Scan {} in {:.2}s (config {})\n",
        summary.status.as_str(),
        summary.elapsed_secs,
        report.config_hash.chars().take(12).collect::<String>()
    ));
    out.push_str(&format!(
        "  requested {}  ranked {}  below {:.0} {}  errors {}\n\n",
        summary.requested,
        summary.ranked,
        report.min_composite_score,
        summary.below_threshold,
        summary.errors
    ));

    out.push_str("Score distribution:\n");
    for bucket in &summary.score_buckets {
        out.push_str(&format!("  {:>7}  {}\n", bucket.label, bucket.count));
    }

    if !summary.rule_passes.is_empty() {
        out.push_str("\nRule passes among ranked:\n");
        for (rule, passes) in &summary.rule_passes {
            out.push_str(&format!("  {rule:<20} {passes}\n"));
        }
    }

    if !report.results.is_empty() {
        out.push_str(&format!("\n{:>4}  {:<10} {:>8}  {}\n", "#", "symbol", "score", "rules"));
        for (i, r) in report.results.iter().take(top_n).enumerate() {
            let outcomes: Vec<String> = r
                .verdicts
                .iter()
                .map(|v| format!("{}={}", v.rule_name, v.outcome.as_str()))
                .collect();
            out.push_str(&format!(
                "{:>4}  {:<10} {:>8.2}  {}\n",
                i + 1,
                r.symbol,
                r.composite_score.unwrap_or(f64::NAN),
                outcomes.join(" ")
            ));
        }
    }

    if !report.errors.is_empty() {
        out.push_str("\nErrors:\n");
        for (symbol, reason) in &report.errors {
            out.push_str(&format!("  {symbol:<10} {reason}\n"));
        }
    }

    out
}

// ─── Sinks ───────────────────────────────────────────────────────────

/// Consumes one report per completed or cancelled scan.
pub trait ReportSink {
    fn write_report(&mut self, report: &ScanReport) -> Result<()>;
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

/// Pretty JSON of the full report.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for JsonFileSink {
    fn write_report(&mut self, report: &ScanReport) -> Result<()> {
        write_file(&self.path, &export_json(report)?)
    }
}

/// Ranked results as CSV.
#[derive(Debug, Clone)]
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for CsvFileSink {
    fn write_report(&mut self, report: &ScanReport) -> Result<()> {
        write_file(&self.path, &export_results_csv(report)?)
    }
}

/// Text summary to any writer (stdout in the CLI).
pub struct ConsoleSink<W: Write> {
    out: W,
    top_n: usize,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W, top_n: usize) -> Self {
        Self { out, top_n }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for ConsoleSink<W> {
    fn write_report(&mut self, report: &ScanReport) -> Result<()> {
        self.out
            .write_all(render_summary(report, self.top_n).as_bytes())
            .context("failed to write scan summary")?;
        self.out.flush().context("failed to flush scan summary")
    }
}
