//! Instrument-data provider trait and structured fetch errors.
//!
//! The orchestrator only ever sees `fetch(symbol) -> BarSeries | FetchError`.
//! Retry, timeouts and source-specific parsing live behind this trait so
//! sources can be swapped and mocked for tests.

use std::collections::HashMap;
use std::sync::Arc;

use screenlab_core::{Bar, BarSeries, SeriesError};
use thiserror::Error;

/// Why a provider could not return bars for a symbol.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("I/O error reading '{symbol}': {source}")]
    Io {
        symbol: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse data for '{symbol}': {reason}")]
    Parse { symbol: String, reason: String },

    #[error("invalid bar series: {0}")]
    InvalidSeries(#[from] SeriesError),

    #[error("transient failure for '{symbol}': {reason}")]
    Transient { symbol: String, reason: String },

    #[error("gave up on '{symbol}' after {attempts} attempts: {last}")]
    Exhausted {
        symbol: String,
        attempts: u32,
        last: String,
    },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient { .. } | FetchError::Io { .. })
    }
}

/// A source of daily bars, one symbol at a time.
///
/// Implementations must return bars in ascending date order; `BarSeries`
/// enforces that at construction. Called concurrently from scan workers.
pub trait InstrumentProvider: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(&self, symbol: &str) -> Result<BarSeries, FetchError>;
}

impl<P: InstrumentProvider + ?Sized> InstrumentProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self, symbol: &str) -> Result<BarSeries, FetchError> {
        (**self).fetch(symbol)
    }
}

impl<P: InstrumentProvider + ?Sized> InstrumentProvider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self, symbol: &str) -> Result<BarSeries, FetchError> {
        (**self).fetch(symbol)
    }
}

// ─── In-memory provider ──────────────────────────────────────────────

#[derive(Debug, Clone)]
enum MemoryEntry {
    Series(BarSeries),
    Failure(String),
}

/// Serves fixed series, or fixed failures, from memory.
///
/// Unknown symbols yield `SymbolNotFound`; configured failures yield
/// `Transient`.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    entries: HashMap<String, MemoryEntry>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, series: BarSeries) -> Self {
        self.insert(series);
        self
    }

    pub fn with_bars(self, symbol: &str, bars: Vec<Bar>) -> Result<Self, SeriesError> {
        Ok(self.with_series(BarSeries::new(symbol, bars)?))
    }

    pub fn with_failure(mut self, symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        self.entries
            .insert(symbol.into(), MemoryEntry::Failure(reason.into()));
        self
    }

    pub fn insert(&mut self, series: BarSeries) {
        self.entries
            .insert(series.symbol().to_string(), MemoryEntry::Series(series));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl InstrumentProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(&self, symbol: &str) -> Result<BarSeries, FetchError> {
        match self.entries.get(symbol) {
            Some(MemoryEntry::Series(series)) => Ok(series.clone()),
            Some(MemoryEntry::Failure(reason)) => Err(FetchError::Transient {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            }),
            None => Err(FetchError::SymbolNotFound {
                symbol: symbol.to_string(),
            }),
        }
    }
}
