//! A ticker with its full price history.
//!
//! The price series is immutable once built and shared across threads via
//! `Arc<Instrument>`. Orders, conditions and engines all read from it.

use std::collections::HashMap;

use chrono::NaiveDate;
use thiserror::Error;

use super::bar::Bar;

#[derive(Debug, Error)]
pub enum InstrumentError {
    #[error("instrument '{0}' has no bars")]
    Empty(String),

    #[error("instrument '{ticker}': tick size must be positive, got {tick_size}")]
    InvalidTickSize { ticker: String, tick_size: f64 },

    #[error("instrument '{ticker}': dates must be strictly ascending (bar {index} on {date})")]
    UnorderedDates {
        ticker: String,
        index: usize,
        date: NaiveDate,
    },
}

/// A tradeable instrument and its OHLCV series.
#[derive(Debug, Clone)]
pub struct Instrument {
    ticker: String,
    tick_size: f64,
    bars: Vec<Bar>,
    date_index: HashMap<NaiveDate, usize>,
}

impl Instrument {
    pub fn new(
        ticker: impl Into<String>,
        tick_size: f64,
        bars: Vec<Bar>,
    ) -> Result<Self, InstrumentError> {
        let ticker = ticker.into();
        if bars.is_empty() {
            return Err(InstrumentError::Empty(ticker));
        }
        if !(tick_size > 0.0) {
            return Err(InstrumentError::InvalidTickSize { ticker, tick_size });
        }

        let mut date_index = HashMap::with_capacity(bars.len());
        for (i, bar) in bars.iter().enumerate() {
            if i > 0 && bar.date <= bars[i - 1].date {
                return Err(InstrumentError::UnorderedDates {
                    ticker,
                    index: i,
                    date: bar.date,
                });
            }
            date_index.insert(bar.date, i);
        }

        Ok(Self {
            ticker,
            tick_size,
            bars,
            date_index,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn tick_size(&self) -> f64 {
        self.tick_size
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    /// Index of the final bar. Orders must not outlive it.
    pub fn last_bar(&self) -> usize {
        self.bars.len() - 1
    }

    pub fn bar(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// Bar index for a calendar date, if this instrument traded that day.
    pub fn bar_index(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        self.bars.get(index).map(|b| b.date)
    }

    // Price accessors return 0.0 past the end of data; callers treat a
    // non-positive price as "no data".

    pub fn open(&self, index: usize) -> f64 {
        self.bars.get(index).map_or(0.0, |b| b.open)
    }

    pub fn high(&self, index: usize) -> f64 {
        self.bars.get(index).map_or(0.0, |b| b.high)
    }

    pub fn low(&self, index: usize) -> f64 {
        self.bars.get(index).map_or(0.0, |b| b.low)
    }

    pub fn close(&self, index: usize) -> f64 {
        self.bars.get(index).map_or(0.0, |b| b.close)
    }

    /// Round a price to the nearest tick.
    pub fn round_to_tick(&self, price: f64) -> f64 {
        (price / self.tick_size).round() * self.tick_size
    }
}
