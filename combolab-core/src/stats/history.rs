//! Order history indexes and rolling queries.
//!
//! Every order is held behind an [`OrderHandle`] so the placing engine can
//! keep driving it while the history reads it. Indexes are `DashMap`s, which
//! makes concurrent inserts from per-instrument workers safe. Workers only
//! query the ticker they write, so a read never races a write for the bar
//! being evaluated.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::domain::Direction;
use crate::orders::{Order, OrderRecord, OrderStatus};

use super::statistics::{DetailedStatistics, StatisticsAccumulator, StrategyStatistics};

/// Shared, lockable order.
pub type OrderHandle = Arc<RwLock<Order>>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryLimits {
    /// Orders entered more than this many bars before the newest insert are
    /// pruned from the bounded index.
    pub max_lookback_bars: usize,
    /// Cap on orders per (ticker, strategy) in the bounded index, and on
    /// orders accepted by a single query.
    pub max_lookback_orders: usize,
    /// Queries accepting this many orders or fewer return an empty record.
    pub min_required_orders: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_lookback_bars: 250,
            max_lookback_orders: 100,
            min_required_orders: 3,
        }
    }
}

type StrategyBuckets = HashMap<String, VecDeque<OrderHandle>>;

#[derive(Debug)]
pub struct OrderHistory {
    limits: HistoryLimits,
    bounded: bool,
    by_ticker: DashMap<String, Vec<OrderHandle>>,
    by_strategy: DashMap<String, Vec<OrderHandle>>,
    by_indicator: DashMap<String, Vec<OrderHandle>>,
    /// ticker -> strategy -> recent orders. Only populated when bounded.
    recent: DashMap<String, StrategyBuckets>,
}

/// Filter applied while scanning.
struct Query<'a> {
    strategy: Option<&'a str>,
    direction: Option<Direction>,
    ticker: Option<&'a str>,
    earliest_bar: usize,
}

impl Query<'_> {
    fn accepts(&self, order: &Order) -> bool {
        order.status() == OrderStatus::Closed
            && order.entry_bar() >= self.earliest_bar
            && self.strategy.map_or(true, |s| order.strategy() == s)
            && self.direction.map_or(true, |d| order.direction() == d)
            && self.ticker.map_or(true, |t| order.ticker() == t)
    }
}

impl OrderHistory {
    /// History with the pruned (ticker, strategy) index.
    pub fn bounded(limits: HistoryLimits) -> Self {
        Self::with_mode(limits, true)
    }

    /// History that answers strategy queries from the full strategy index.
    pub fn unbounded(limits: HistoryLimits) -> Self {
        Self::with_mode(limits, false)
    }

    fn with_mode(limits: HistoryLimits, bounded: bool) -> Self {
        Self {
            limits,
            bounded,
            by_ticker: DashMap::new(),
            by_strategy: DashMap::new(),
            by_indicator: DashMap::new(),
            recent: DashMap::new(),
        }
    }

    pub fn limits(&self) -> HistoryLimits {
        self.limits
    }

    pub fn is_bounded(&self) -> bool {
        self.bounded
    }

    // ── Inserts ────────────────────────────────────────────────────────

    /// Record an order placed on `current_bar`.
    pub fn add_order(&self, handle: &OrderHandle, dependent_indicators: &[String], current_bar: usize) {
        let (ticker, strategy) = {
            let order = handle.read();
            (order.ticker().to_string(), order.strategy().to_string())
        };

        self.by_ticker
            .entry(ticker.clone())
            .or_default()
            .push(Arc::clone(handle));
        self.by_strategy
            .entry(strategy.clone())
            .or_default()
            .push(Arc::clone(handle));
        for indicator in dependent_indicators {
            self.by_indicator
                .entry(indicator.clone())
                .or_default()
                .push(Arc::clone(handle));
        }

        if self.bounded {
            let mut buckets = self.recent.entry(ticker).or_default();
            let bucket = buckets.entry(strategy).or_default();
            bucket.push_back(Arc::clone(handle));
            self.prune(bucket, current_bar);
        }
    }

    /// Recency first, then count.
    fn prune(&self, bucket: &mut VecDeque<OrderHandle>, current_bar: usize) {
        let earliest = current_bar.saturating_sub(self.limits.max_lookback_bars);
        bucket.retain(|h| h.read().entry_bar() >= earliest);
        while bucket.len() > self.limits.max_lookback_orders {
            bucket.pop_front();
        }
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// Rolling statistics for one strategy on one ticker.
    ///
    /// Only closed orders entered within `max_bars_ago` of `current_bar`
    /// count. `direction` of `None` accepts both sides.
    pub fn strategy_statistics(
        &self,
        name: &str,
        direction: Option<Direction>,
        ticker: &str,
        current_bar: usize,
        max_bars_ago: usize,
    ) -> StrategyStatistics {
        let query = Query {
            strategy: Some(name),
            direction,
            ticker: Some(ticker),
            earliest_bar: current_bar.saturating_sub(max_bars_ago),
        };
        let orders = self.strategy_candidates(name, ticker);
        self.summarize(name, &orders, &query, None)
    }

    /// Like [`strategy_statistics`](Self::strategy_statistics) but keeps the
    /// accepted orders as records.
    pub fn detailed_strategy_statistics(
        &self,
        name: &str,
        direction: Option<Direction>,
        ticker: &str,
        current_bar: usize,
        max_bars_ago: usize,
    ) -> DetailedStatistics {
        let query = Query {
            strategy: Some(name),
            direction,
            ticker: Some(ticker),
            earliest_bar: current_bar.saturating_sub(max_bars_ago),
        };
        let orders = self.strategy_candidates(name, ticker);
        let mut records = Vec::new();
        let statistics = self.summarize(name, &orders, &query, Some(&mut records));
        if statistics.is_empty() {
            records.clear();
        }
        DetailedStatistics {
            statistics,
            orders: records,
        }
    }

    /// Rolling statistics across every strategy on a ticker.
    pub fn ticker_statistics(&self, ticker: &str, current_bar: usize, max_bars_ago: usize) -> StrategyStatistics {
        let query = Query {
            strategy: None,
            direction: None,
            ticker: Some(ticker),
            earliest_bar: current_bar.saturating_sub(max_bars_ago),
        };
        let orders = snapshot(&self.by_ticker, ticker);
        self.summarize(ticker, &orders, &query, None)
    }

    /// Rolling statistics across every order depending on an indicator.
    pub fn indicator_statistics(&self, indicator: &str, current_bar: usize, max_bars_ago: usize) -> StrategyStatistics {
        let query = Query {
            strategy: None,
            direction: None,
            ticker: None,
            earliest_bar: current_bar.saturating_sub(max_bars_ago),
        };
        let orders = snapshot(&self.by_indicator, indicator);
        self.summarize(indicator, &orders, &query, None)
    }

    fn strategy_candidates(&self, name: &str, ticker: &str) -> Vec<OrderHandle> {
        if self.bounded {
            self.recent
                .get(ticker)
                .and_then(|buckets| buckets.get(name).map(|b| b.iter().cloned().collect()))
                .unwrap_or_default()
        } else {
            snapshot(&self.by_strategy, name)
        }
    }

    /// Scan newest-first, stopping at `max_lookback_orders` accepted.
    fn summarize(
        &self,
        name: &str,
        orders: &[OrderHandle],
        query: &Query<'_>,
        mut records: Option<&mut Vec<OrderRecord>>,
    ) -> StrategyStatistics {
        let mut acc = StatisticsAccumulator::new();
        for handle in orders.iter().rev() {
            if acc.count() >= self.limits.max_lookback_orders {
                break;
            }
            let order = handle.read();
            if !query.accepts(&order) {
                continue;
            }
            acc.accept(&order);
            if let Some(out) = records.as_deref_mut() {
                out.push(order.to_record());
            }
        }
        acc.finish(name, self.limits.min_required_orders)
    }

    // ── Introspection ──────────────────────────────────────────────────

    pub fn tickers(&self) -> Vec<String> {
        let mut out: Vec<String> = self.by_ticker.iter().map(|e| e.key().clone()).collect();
        out.sort();
        out
    }

    pub fn indicators(&self) -> Vec<String> {
        let mut out: Vec<String> = self.by_indicator.iter().map(|e| e.key().clone()).collect();
        out.sort();
        out
    }

    pub fn order_count(&self) -> usize {
        self.by_ticker.iter().map(|e| e.value().len()).sum()
    }

    pub fn strategy_order_count(&self, name: &str) -> usize {
        self.by_strategy.get(name).map_or(0, |v| v.len())
    }

    /// Size of the bounded (ticker, strategy) bucket.
    pub fn recent_len(&self, ticker: &str, strategy: &str) -> usize {
        self.recent
            .get(ticker)
            .and_then(|b| b.get(strategy).map(VecDeque::len))
            .unwrap_or(0)
    }

    /// Entry bars currently in a bounded bucket, oldest first.
    pub fn recent_entry_bars(&self, ticker: &str, strategy: &str) -> Vec<usize> {
        self.recent
            .get(ticker)
            .and_then(|b| {
                b.get(strategy)
                    .map(|q| q.iter().map(|h| h.read().entry_bar()).collect())
            })
            .unwrap_or_default()
    }
}

/// Clone the handle list out so no map guard is held while orders are read.
fn snapshot(map: &DashMap<String, Vec<OrderHandle>>, key: &str) -> Vec<OrderHandle> {
    map.get(key).map(|v| v.clone()).unwrap_or_default()
}
