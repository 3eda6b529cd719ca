use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Direction;
use crate::orders::OrderTicket;
use crate::stats::StrategyStatistics;

/// An engine's proposal for one instrument on one bar.
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub ticker: String,
    pub name: String,
    pub direction: Direction,
    /// Rolling win percent of the combo; zero when the sample is too small.
    pub highest_percent: f64,
    /// Rolling total gain of the combo.
    pub gain: f64,
    /// Requested dollar size.
    pub size: f64,
    pub indicators: Vec<String>,
    pub statistics: StrategyStatistics,
    /// Per-order expectancy, when the statistics support one.
    pub expected_gain: Option<f64>,
    /// Conditions to open an account order with.
    pub ticket: OrderTicket,
}

impl Suggestion {
    /// Key used to rank candidates, highest first.
    pub fn ranking_gain(&self) -> f64 {
        self.expected_gain.unwrap_or(self.gain)
    }

    pub fn to_candidate(&self, date: NaiveDate, rank: usize) -> RankedCandidate {
        RankedCandidate {
            date,
            rank,
            ticker: self.ticker.clone(),
            name: self.name.clone(),
            direction: self.direction,
            highest_percent: self.highest_percent,
            gain: self.gain,
            expected_gain: self.expected_gain,
        }
    }
}

/// Expectancy from win/loss rates and average outcomes.
pub(crate) fn expectancy(stats: &StrategyStatistics) -> Option<f64> {
    if stats.is_empty() {
        return None;
    }
    Some(stats.win_percent / 100.0 * stats.average_win + stats.loss_percent / 100.0 * stats.average_loss)
}

/// Exported row of a per-date candidate ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub date: NaiveDate,
    pub rank: usize,
    pub ticker: String,
    pub name: String,
    pub direction: Direction,
    pub highest_percent: f64,
    pub gain: f64,
    pub expected_gain: Option<f64>,
}
