use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::orders::OrderRecord;
use crate::stats::StrategyStatistics;
use crate::strategy::RankedCandidate;

use super::account::ValuePoint;

/// Combo statistics an instrument's engines reported on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboStatsSnapshot {
    pub date: NaiveDate,
    pub ticker: String,
    pub statistics: Vec<StrategyStatistics>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakerEvent {
    pub date: NaiveDate,
    pub baseline: f64,
    pub value: f64,
}

/// Everything a run produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub initial_cash: f64,
    pub final_cash: f64,
    pub final_value: f64,
    /// Closed and cancelled account orders, in the order they finished.
    pub closed_orders: Vec<OrderRecord>,
    /// Account orders still active after the last date.
    pub open_orders: Vec<OrderRecord>,
    /// Candidate ranking per date, best first.
    pub candidates: Vec<RankedCandidate>,
    pub value_series: Vec<ValuePoint>,
    pub combo_statistics: Vec<ComboStatsSnapshot>,
    /// Rolling statistics per ticker as of each ticker's last bar.
    pub ticker_statistics: Vec<StrategyStatistics>,
    /// Statistics per dependent indicator over the whole run, by name.
    pub indicator_statistics: Vec<StrategyStatistics>,
    pub breaker_events: Vec<BreakerEvent>,
    /// Tracking orders placed by the combo engines.
    pub tracking_orders: usize,
}

impl RunResult {
    pub fn total_return(&self) -> f64 {
        if self.initial_cash > 0.0 {
            self.final_value / self.initial_cash - 1.0
        } else {
            0.0
        }
    }

    pub fn total_gain(&self) -> f64 {
        self.closed_orders.iter().map(|o| o.gain).sum()
    }
}
