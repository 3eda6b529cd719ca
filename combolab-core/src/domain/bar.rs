use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar of one instrument.
///
/// Prices arrive precomputed and are used as-is; the engine never adjusts
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Finite, positive prices with the high and low bracketing open and close.
    ///
    /// Malformed bars are still simulated; loaders only report them.
    pub fn is_well_formed(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite() && *p > 0.0)
            && self.low <= self.open.min(self.close)
            && self.high >= self.open.max(self.close)
    }
}
