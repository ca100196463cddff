//! CSV directory provider.
//!
//! Reads `<dir>/<SYMBOL>.csv` with a `date,open,high,low,close,volume`
//! header. Rows must already be in ascending date order; each bar is
//! sanity-checked on load.

use std::path::{Path, PathBuf};

use screenlab_core::{Bar, BarSeries};

use crate::provider::{FetchError, InstrumentProvider};

#[derive(Debug, Clone)]
pub struct CsvDirectoryProvider {
    dir: PathBuf,
}

impl CsvDirectoryProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, symbol: &str) -> Option<PathBuf> {
        let valid = !symbol.is_empty()
            && symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '^'))
            && !symbol.starts_with('.');
        valid.then(|| self.dir.join(format!("{symbol}.csv")))
    }
}

impl InstrumentProvider for CsvDirectoryProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, symbol: &str) -> Result<BarSeries, FetchError> {
        let not_found = || FetchError::SymbolNotFound {
            symbol: symbol.to_string(),
        };
        let path = self.path_for(symbol).ok_or_else(not_found)?;
        if !path.is_file() {
            return Err(not_found());
        }

        let file = std::fs::File::open(&path).map_err(|source| FetchError::Io {
            symbol: symbol.to_string(),
            source,
        })?;
        let mut reader = csv::Reader::from_reader(file);

        let mut bars = Vec::new();
        for (row, record) in reader.deserialize::<Bar>().enumerate() {
            // +2: one for the header, one for 1-based line numbers.
            let line = row + 2;
            let bar = record.map_err(|e| FetchError::Parse {
                symbol: symbol.to_string(),
                reason: format!("line {line}: {e}"),
            })?;
            if !bar.is_sane() {
                return Err(FetchError::Parse {
                    symbol: symbol.to_string(),
                    reason: format!("line {line}: inconsistent OHLC values on {}", bar.date),
                });
            }
            bars.push(bar);
        }

        Ok(BarSeries::new(symbol, bars)?)
    }
}
