//! Rolling performance statistics over order history.
//!
//! [`OrderHistory`] indexes every order the engines place by ticker, by
//! strategy name and (in bounded mode) by ticker and strategy together.
//! Queries turn the finished orders in those indexes into
//! [`StrategyStatistics`] records.

mod history;
mod statistics;

pub use history::{HistoryLimits, OrderHandle, OrderHistory};
pub use statistics::{DetailedStatistics, StatisticsAccumulator, StrategyStatistics};
