//! BarSeries — the ordered daily history of one instrument.

use super::Bar;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("bar series for '{symbol}' is empty")]
    Empty { symbol: String },

    #[error("bar series for '{symbol}' is not strictly ascending at index {index}: {previous} then {date}")]
    OutOfOrder {
        symbol: String,
        index: usize,
        previous: NaiveDate,
        date: NaiveDate,
    },
}

/// Non-empty bar history for one symbol, strictly ascending by date.
///
/// The ordering invariant is checked once here, at ingestion. Everything
/// downstream indexes into `bars()` assuming it holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        if bars.is_empty() {
            return Err(SeriesError::Empty { symbol });
        }
        for (index, pair) in bars.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(SeriesError::OutOfOrder {
                    symbol,
                    index: index + 1,
                    previous: pair[0].date,
                    date: pair[1].date,
                });
            }
        }
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.bars.len() - 1
    }

    pub fn last(&self) -> &Bar {
        &self.bars[self.bars.len() - 1]
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.last().date
    }
}
