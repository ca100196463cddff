//! Synthetic bars for development and demos.
//!
//! A seeded random walk from a starting price of 100.0, one bar per weekday.
//! The seed is the BLAKE3 hash of the symbol, so the same symbol always gets
//! the same series and different symbols get different ones.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use screenlab_core::{Bar, BarSeries};

use crate::provider::{FetchError, InstrumentProvider};

pub const DEFAULT_SYNTHETIC_BARS: usize = 300;

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    start: NaiveDate,
    bars: usize,
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap_or_default(),
            bars: DEFAULT_SYNTHETIC_BARS,
        }
    }
}

impl SyntheticProvider {
    pub fn new(start: NaiveDate, bars: usize) -> Self {
        Self { start, bars }
    }

    pub fn bars_per_symbol(&self) -> usize {
        self.bars
    }
}

impl InstrumentProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, symbol: &str) -> Result<BarSeries, FetchError> {
        if symbol.trim().is_empty() {
            return Err(FetchError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        Ok(BarSeries::new(
            symbol,
            generate_synthetic_bars(symbol, self.start, self.bars),
        )?)
    }
}

/// `count` weekday bars starting at `start`, deterministic per symbol.
pub fn generate_synthetic_bars(symbol: &str, start: NaiveDate, count: usize) -> Vec<Bar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::with_capacity(count);
    let mut price = 100.0_f64;
    let mut current = start;

    while bars.len() < count {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(Bar {
            date: current,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}
