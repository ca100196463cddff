//! Scan Orchestrator — one composite evaluation per requested symbol.
//!
//! Lifecycle: `Created → Running → {Completed, Cancelled}`.
//!
//! Each symbol is one self-contained task on a bounded rayon pool: fetch
//! bars, run `evaluate_all`, append to a single mutex-guarded accumulator.
//! Cancellation is cooperative. Once requested, tasks not yet started are
//! recorded as undispatched; tasks already running finish and keep their
//! results.
//!
//! Per-symbol faults never fail the scan. Only an invalid request or a pool
//! that cannot be built returns `Err`.

use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use rayon::prelude::*;
use screenlab_core::{CompositeResult, ConfigError, RuleRegistry};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::provider::InstrumentProvider;
use crate::report::{ScanReport, ScanStatus};

pub const DEFAULT_MIN_COMPOSITE_SCORE: f64 = 60.0;
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Reason recorded for symbols a cancelled scan never started.
pub const CANCELLED_BEFORE_DISPATCH: &str = "scan cancelled before dispatch";

// ─── Request ─────────────────────────────────────────────────────────

/// What to scan and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub symbols: BTreeSet<String>,
    pub min_composite_score: f64,
    pub max_concurrency: usize,
    /// Extra indicators whose latest values are reported per result.
    pub indicators: Vec<String>,
}

impl ScanRequest {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            min_composite_score: DEFAULT_MIN_COMPOSITE_SCORE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            indicators: Vec::new(),
        }
    }

    pub fn with_min_score(mut self, min_composite_score: f64) -> Self {
        self.min_composite_score = min_composite_score;
        self
    }

    pub fn with_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_indicators<I, S>(mut self, indicators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indicators = indicators.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.symbols.is_empty() {
            return Err(ScanError::InvalidRequest("no symbols requested".into()));
        }
        if let Some(blank) = self.symbols.iter().find(|s| s.trim().is_empty()) {
            return Err(ScanError::InvalidRequest(format!(
                "blank symbol {blank:?} in request"
            )));
        }
        if self.max_concurrency == 0 {
            return Err(ScanError::InvalidRequest(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if !self.min_composite_score.is_finite() {
            return Err(ScanError::InvalidRequest(format!(
                "min_composite_score must be finite, got {}",
                self.min_composite_score
            )));
        }
        RuleRegistry::parse_indicator_names(&self.indicators)
            .map_err(|e| ScanError::InvalidRequest(e.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid scan request: {0}")]
    InvalidRequest(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

// ─── Control & progress ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanState {
    Created,
    Running,
    Completed,
    Cancelled,
}

impl ScanState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ScanState::Running,
            2 => ScanState::Completed,
            3 => ScanState::Cancelled,
            _ => ScanState::Created,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ScanState::Created => 0,
            ScanState::Running => 1,
            ScanState::Completed => 2,
            ScanState::Cancelled => 3,
        }
    }
}

/// Best-effort progress snapshot. Not part of the report's contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Tasks finished, whatever their outcome.
    pub completed: usize,
    pub total: usize,
    /// Finished tasks that met the minimum composite score.
    pub found: usize,
}

/// Shared handle for observing and cancelling one scan.
///
/// Cheap to share by reference with another thread while `run_scan` holds
/// it. A control is single-use.
#[derive(Debug, Default)]
pub struct ScanControl {
    cancelled: AtomicBool,
    state: AtomicU8,
    completed: AtomicUsize,
    total: AtomicUsize,
    found: AtomicUsize,
}

impl ScanControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cooperative cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> ScanState {
        ScanState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn progress(&self) -> ScanProgress {
        ScanProgress {
            completed: self.completed.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
            found: self.found.load(Ordering::Relaxed),
        }
    }

    fn set_state(&self, state: ScanState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    fn start(&self, total: usize) -> Result<(), ScanError> {
        self.state
            .compare_exchange(
                ScanState::Created.as_u8(),
                ScanState::Running.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| ScanError::InvalidRequest("scan control has already been used".into()))?;
        self.total.store(total, Ordering::Relaxed);
        Ok(())
    }

    fn record(&self, found: bool) -> ScanProgress {
        if found {
            self.found.fetch_add(1, Ordering::Relaxed);
        }
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.progress()
    }
}

// ─── Orchestration ───────────────────────────────────────────────────

enum TaskOutcome {
    Evaluated(CompositeResult),
    Failed(String),
    NotDispatched,
}

#[derive(Default)]
struct Accumulator {
    evaluated: Vec<CompositeResult>,
    errors: BTreeMap<String, String>,
}

/// Progress callback, invoked from worker threads after each task.
pub type ProgressCallback<'a> = &'a (dyn Fn(&ScanProgress) + Sync);

/// Run one scan to completion or cancellation.
pub fn run_scan<P>(
    registry: &RuleRegistry,
    provider: &P,
    request: &ScanRequest,
    control: &ScanControl,
    progress_cb: Option<ProgressCallback<'_>>,
) -> Result<ScanReport, ScanError>
where
    P: InstrumentProvider + ?Sized,
{
    request.validate()?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(request.max_concurrency)
        .thread_name(|i| format!("screenlab-worker-{i}"))
        .build()?;

    let symbols: Vec<&String> = request.symbols.iter().collect();
    control.start(symbols.len())?;

    let started_at = Utc::now();
    let config_hash = registry.fingerprint();
    info!(
        symbols = symbols.len(),
        workers = request.max_concurrency,
        rules = registry.len(),
        provider = provider.name(),
        config_hash = config_hash.short(),
        "scan started"
    );

    let accumulator = Mutex::new(Accumulator::default());

    pool.install(|| {
        symbols.par_iter().with_max_len(1).for_each(|symbol| {
            let outcome = if control.is_cancelled() {
                TaskOutcome::NotDispatched
            } else {
                scan_symbol(registry, provider, symbol, request)
            };

            let found = matches!(&outcome, TaskOutcome::Evaluated(r) if r.passed);
            {
                let mut acc = accumulator.lock().unwrap_or_else(PoisonError::into_inner);
                match outcome {
                    TaskOutcome::Evaluated(result) => acc.evaluated.push(result),
                    TaskOutcome::Failed(reason) => {
                        acc.errors.insert((*symbol).clone(), reason);
                    }
                    TaskOutcome::NotDispatched => {
                        acc.errors
                            .insert((*symbol).clone(), CANCELLED_BEFORE_DISPATCH.to_string());
                    }
                }
            }

            let progress = control.record(found);
            if let Some(cb) = progress_cb {
                cb(&progress);
            }
        });
    });

    let Accumulator { evaluated, errors } =
        accumulator.into_inner().unwrap_or_else(PoisonError::into_inner);
    let (mut results, below): (Vec<CompositeResult>, Vec<CompositeResult>) =
        evaluated.into_iter().partition(|r| r.passed);
    sort_ranked(&mut results);
    let below_threshold = below
        .into_iter()
        .filter_map(|r| r.composite_score.map(|s| (r.symbol, s)))
        .collect();

    let status = if control.is_cancelled() {
        ScanStatus::Cancelled
    } else {
        ScanStatus::Completed
    };
    control.set_state(match status {
        ScanStatus::Completed => ScanState::Completed,
        ScanStatus::Cancelled => ScanState::Cancelled,
    });

    let report = ScanReport {
        requested_symbols: request.symbols.iter().cloned().collect(),
        results,
        below_threshold,
        errors,
        status,
        min_composite_score: request.min_composite_score,
        config_hash: config_hash.to_string(),
        started_at,
        completed_at: Utc::now(),
    };

    info!(
        status = status.as_str(),
        ranked = report.results.len(),
        below_threshold = report.below_threshold.len(),
        errors = report.errors.len(),
        elapsed_secs = report.elapsed_secs(),
        "scan finished"
    );
    Ok(report)
}

/// Composite score descending, ties by symbol ascending.
pub fn sort_ranked(results: &mut [CompositeResult]) {
    results.sort_by(|a, b| {
        let sa = a.composite_score.unwrap_or(f64::NEG_INFINITY);
        let sb = b.composite_score.unwrap_or(f64::NEG_INFINITY);
        sb.total_cmp(&sa).then_with(|| a.symbol.cmp(&b.symbol))
    });
}

fn scan_symbol<P>(
    registry: &RuleRegistry,
    provider: &P,
    symbol: &str,
    request: &ScanRequest,
) -> TaskOutcome
where
    P: InstrumentProvider + ?Sized,
{
    let fetched = panic::catch_unwind(AssertUnwindSafe(|| provider.fetch(symbol)));
    let series = match fetched {
        Ok(Ok(series)) => series,
        Ok(Err(err)) => {
            warn!(symbol, error = %err, "fetch failed");
            return TaskOutcome::Failed(format!("fetch failed: {err}"));
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(symbol, panic = %message, "provider panicked");
            return TaskOutcome::Failed(format!("fetch failed: provider panicked: {message}"));
        }
    };

    let evaluated = panic::catch_unwind(AssertUnwindSafe(|| {
        registry.evaluate_all(&series, &request.indicators, request.min_composite_score)
    }));
    let result = match evaluated {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(symbol, panic = %message, "evaluation panicked");
            return TaskOutcome::Failed(format!("evaluation panicked: {message}"));
        }
    };
    match result.failure_reason() {
        Some(reason) => {
            warn!(symbol, reason = %reason, "no composite score");
            TaskOutcome::Failed(reason)
        }
        None => {
            debug!(
                symbol,
                score = ?result.composite_score,
                passed = result.passed,
                "symbol evaluated"
            );
            TaskOutcome::Evaluated(result)
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
