//! One simulated position and its lifecycle.
//!
//! Status moves one way only:
//!
//! ```text
//! Open ──buy──▶ Filled ──sell──▶ Closed
//!   └──cancel──▶ Cancelled
//! ```
//!
//! An order created in reaction to bar N may act from bar N+1 on
//! (`opened_bar`). It is driven exclusively through [`Order::update`], which
//! polls the priority-sorted buy or sell conditions and performs at most one
//! transition per call.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Direction, Instrument, OrderId};

use super::condition::{BuyCondition, SellCondition};
use super::extra_info::ExtraInfo;

/// Reason recorded when an order is closed because its data ran out.
pub const FORCED_CLOSE: &str = "forced close";

/// Reason recorded when an order is still unfilled on the final bar.
pub const END_OF_DATA: &str = "end of data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    Filled,
    Closed,
    Cancelled,
}

impl OrderStatus {
    /// Closed or cancelled. Both are absorbing.
    pub fn is_finished(self) -> bool {
        matches!(self, OrderStatus::Closed | OrderStatus::Cancelled)
    }
}

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order {id}: cannot {action} while {from:?}")]
    InvalidTransition {
        id: OrderId,
        action: &'static str,
        from: OrderStatus,
    },
}

/// Everything needed to open an order except its id, instrument and bar.
#[derive(Debug, Clone)]
pub struct OrderTicket {
    pub strategy: String,
    pub direction: Direction,
    /// Requested dollar size.
    pub size: f64,
    /// Commission charged on each side of the round trip.
    pub commission: f64,
    pub dependent_indicators: Vec<String>,
    pub buy_conditions: Vec<Box<dyn BuyCondition>>,
    pub sell_conditions: Vec<Box<dyn SellCondition>>,
}

#[derive(Debug)]
pub struct Order {
    id: OrderId,
    instrument: Arc<Instrument>,
    strategy: String,
    direction: Direction,
    size: f64,
    commission: f64,
    dependent_indicators: Vec<String>,

    status: OrderStatus,
    opened_bar: usize,

    shares: f64,
    buy_price: f64,
    buy_bar: Option<usize>,
    buy_date: Option<NaiveDate>,
    buy_reason: Option<String>,

    sell_price: f64,
    sell_bar: Option<usize>,
    sell_date: Option<NaiveDate>,
    sell_reason: Option<String>,

    market_value: f64,
    gain: f64,

    buy_conditions: Vec<Box<dyn BuyCondition>>,
    sell_conditions: Vec<Box<dyn SellCondition>>,
    extra: ExtraInfo,
}

impl Order {
    /// Open a new order in reaction to `current_bar`.
    ///
    /// Conditions are sorted by priority (stable, so equal priorities keep
    /// their given order) and each receives its `on_open` callback.
    pub fn open(
        id: OrderId,
        instrument: Arc<Instrument>,
        current_bar: usize,
        ticket: OrderTicket,
    ) -> Self {
        let OrderTicket {
            strategy,
            direction,
            size,
            commission,
            dependent_indicators,
            mut buy_conditions,
            mut sell_conditions,
        } = ticket;

        buy_conditions.sort_by_key(|c| c.priority());
        sell_conditions.sort_by_key(|c| c.priority());

        let mut order = Self {
            id,
            instrument,
            strategy,
            direction,
            size,
            commission,
            dependent_indicators,
            status: OrderStatus::Open,
            opened_bar: current_bar + 1,
            shares: 0.0,
            buy_price: 0.0,
            buy_bar: None,
            buy_date: None,
            buy_reason: None,
            sell_price: 0.0,
            sell_bar: None,
            sell_date: None,
            sell_reason: None,
            market_value: 0.0,
            gain: 0.0,
            buy_conditions: Vec::new(),
            sell_conditions: Vec::new(),
            extra: ExtraInfo::new(),
        };

        for c in buy_conditions.iter_mut() {
            c.on_open(&order);
        }
        for c in sell_conditions.iter_mut() {
            c.on_open(&order);
        }
        order.buy_conditions = buy_conditions;
        order.sell_conditions = sell_conditions;
        order
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Advance the order to `bar`. Performs at most one status transition.
    pub fn update(&mut self, bar: usize) {
        if bar < self.opened_bar {
            return;
        }
        let last_bar = self.instrument.last_bar();

        match self.status {
            OrderStatus::Open => {
                let mut conditions = std::mem::take(&mut self.buy_conditions);
                let fired = conditions.iter_mut().any(|c| c.on_update(self, bar));
                self.buy_conditions = conditions;

                if !fired && bar >= last_bar {
                    self.cancel_with_reason(END_OF_DATA);
                }
            }
            OrderStatus::Filled => {
                self.mark_to_market(bar);

                let mut conditions = std::mem::take(&mut self.sell_conditions);
                let fired = conditions.iter_mut().any(|c| c.on_update(self, bar));
                self.sell_conditions = conditions;

                if !fired && bar >= last_bar {
                    let close = self.instrument.close(bar);
                    self.close_at(close, bar, FORCED_CLOSE);
                }
            }
            OrderStatus::Closed | OrderStatus::Cancelled => {}
        }
    }

    /// Fill the order. Only valid while `Open`.
    pub fn buy(&mut self, price: f64, bar: usize, reason: &str) -> Result<(), OrderError> {
        if self.status != OrderStatus::Open {
            return Err(self.invalid("buy"));
        }
        self.buy_price = price;
        self.buy_bar = Some(bar);
        self.buy_date = self.instrument.date(bar);
        self.buy_reason = Some(reason.to_string());
        self.shares = if price > 0.0 {
            (self.size / price).floor()
        } else {
            0.0
        };
        self.market_value = self.shares * price;
        self.status = OrderStatus::Filled;
        Ok(())
    }

    /// Close the order. Only valid while `Filled`.
    ///
    /// A non-positive price means there is no data to price the exit; the
    /// buy price is substituted and the round trip is recorded as flat.
    pub fn sell(&mut self, price: f64, bar: usize, reason: &str) -> Result<(), OrderError> {
        if self.status != OrderStatus::Filled {
            return Err(self.invalid("sell"));
        }
        self.close_at(price, bar, reason);
        Ok(())
    }

    /// `Filled -> Closed`. Callers check the status.
    fn close_at(&mut self, price: f64, bar: usize, reason: &str) {
        let priced = price > 0.0;
        let price = if priced { price } else { self.buy_price };

        self.sell_price = price;
        self.sell_bar = Some(bar);
        self.sell_date = self.instrument.date(bar);
        self.sell_reason = Some(reason.to_string());
        self.market_value = self.shares * price;
        self.gain = if priced {
            (self.shares * price - self.shares * self.buy_price) * self.direction.multiplier()
                - 2.0 * self.commission
        } else {
            0.0
        };
        self.status = OrderStatus::Closed;
    }

    /// Cancel an unfilled order.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::Open {
            return Err(self.invalid("cancel"));
        }
        self.cancel_with_reason("cancelled");
        Ok(())
    }

    fn cancel_with_reason(&mut self, reason: &str) {
        self.sell_reason = Some(reason.to_string());
        self.status = OrderStatus::Cancelled;
    }

    fn mark_to_market(&mut self, bar: usize) {
        let close = self.instrument.close(bar);
        if close > 0.0 {
            self.market_value = self.shares * close;
        }
    }

    fn invalid(&self, action: &'static str) -> OrderError {
        OrderError::InvalidTransition {
            id: self.id,
            action,
            from: self.status,
        }
    }

    // ── Valuation ──────────────────────────────────────────────────────

    /// Long-equivalent value of the position, positive for both directions.
    ///
    /// While filled: `(mtm - cost) * direction + cost`. Closed orders do not
    /// use that formula: their value is `cost + gain`, which includes both
    /// commissions.
    pub fn value(&self) -> f64 {
        let cost = self.shares * self.buy_price;
        match self.status {
            OrderStatus::Open | OrderStatus::Cancelled => 0.0,
            OrderStatus::Filled => (self.market_value - cost) * self.direction.multiplier() + cost,
            OrderStatus::Closed => cost + self.gain,
        }
    }

    /// Bar used for recency checks: the fill bar, or the first bar the order
    /// could have filled on.
    pub fn entry_bar(&self) -> usize {
        self.buy_bar.unwrap_or(self.opened_bar)
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn instrument(&self) -> &Arc<Instrument> {
        &self.instrument
    }

    pub fn ticker(&self) -> &str {
        self.instrument.ticker()
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn commission(&self) -> f64 {
        self.commission
    }

    pub fn dependent_indicators(&self) -> &[String] {
        &self.dependent_indicators
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    pub fn opened_bar(&self) -> usize {
        self.opened_bar
    }

    pub fn shares(&self) -> f64 {
        self.shares
    }

    pub fn buy_price(&self) -> f64 {
        self.buy_price
    }

    pub fn buy_bar(&self) -> Option<usize> {
        self.buy_bar
    }

    pub fn buy_reason(&self) -> Option<&str> {
        self.buy_reason.as_deref()
    }

    pub fn sell_price(&self) -> f64 {
        self.sell_price
    }

    pub fn sell_bar(&self) -> Option<usize> {
        self.sell_bar
    }

    pub fn sell_reason(&self) -> Option<&str> {
        self.sell_reason.as_deref()
    }

    pub fn market_value(&self) -> f64 {
        self.market_value
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn buy_conditions(&self) -> &[Box<dyn BuyCondition>] {
        &self.buy_conditions
    }

    pub fn sell_conditions(&self) -> &[Box<dyn SellCondition>] {
        &self.sell_conditions
    }

    // ── Export ─────────────────────────────────────────────────────────

    /// Attach a diagnostic computed only when the order is exported.
    pub fn defer_info<F>(&mut self, key: impl Into<String>, f: F)
    where
        F: Fn(&Order) -> Value + Send + Sync + 'static,
    {
        self.extra.defer(key, f);
    }

    pub fn extra_info(&self) -> &ExtraInfo {
        &self.extra
    }

    /// Serializable snapshot. Evaluates all deferred diagnostics.
    pub fn to_record(&self) -> OrderRecord {
        OrderRecord {
            id: self.id,
            ticker: self.ticker().to_string(),
            strategy: self.strategy.clone(),
            direction: self.direction,
            status: self.status,
            size: self.size,
            shares: self.shares,
            opened_bar: self.opened_bar,
            buy_bar: self.buy_bar,
            buy_date: self.buy_date,
            buy_price: self.buy_price,
            buy_reason: self.buy_reason.clone(),
            sell_bar: self.sell_bar,
            sell_date: self.sell_date,
            sell_price: self.sell_price,
            sell_reason: self.sell_reason.clone(),
            gain: self.gain,
            value: self.value(),
            dependent_indicators: self.dependent_indicators.clone(),
            extra: self.extra.evaluate(self),
        }
    }
}

/// Exported order, for persistence and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub ticker: String,
    pub strategy: String,
    pub direction: Direction,
    pub status: OrderStatus,
    pub size: f64,
    pub shares: f64,
    pub opened_bar: usize,
    pub buy_bar: Option<usize>,
    pub buy_date: Option<NaiveDate>,
    pub buy_price: f64,
    pub buy_reason: Option<String>,
    pub sell_bar: Option<usize>,
    pub sell_date: Option<NaiveDate>,
    pub sell_price: f64,
    pub sell_reason: Option<String>,
    pub gain: f64,
    pub value: f64,
    pub dependent_indicators: Vec<String>,
    pub extra: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use crate::orders::condition::priority;
    use crate::orders::conditions::{MarketBuy, MaxBarsOpen};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn instrument(closes: &[f64]) -> Arc<Instrument> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                date: base + chrono::Duration::days(i as i64),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1000,
            })
            .collect();
        Arc::new(Instrument::new("SPY", 0.01, bars).unwrap())
    }

    fn ticket(direction: Direction, commission: f64) -> OrderTicket {
        OrderTicket {
            strategy: "a-b".into(),
            direction,
            size: 1000.0,
            commission,
            dependent_indicators: vec!["sma_10".into()],
            buy_conditions: vec![],
            sell_conditions: vec![],
        }
    }

    /// Sells at close and records the bar it fired on.
    #[derive(Debug, Clone)]
    struct SellAtClose {
        prio: i32,
        tag: &'static str,
    }

    impl SellCondition for SellAtClose {
        fn name(&self) -> &str {
            self.tag
        }
        fn priority(&self) -> i32 {
            self.prio
        }
        fn on_update(&mut self, order: &mut Order, bar: usize) -> bool {
            let close = order.instrument().close(bar);
            order.sell(close, bar, self.tag).is_ok()
        }
        fn boxed_clone(&self) -> Box<dyn SellCondition> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn long_gain_with_commission() {
        let mut order = Order::open(OrderId(1), instrument(&[100.0; 3]), 0, ticket(Direction::Long, 5.0));
        order.buy(100.0, 1, "test").unwrap();
        assert_eq!(order.shares(), 10.0);
        order.sell(110.0, 2, "test").unwrap();
        assert_eq!(order.gain(), 90.0);
    }

    #[test]
    fn short_gain_with_commission() {
        let mut order = Order::open(OrderId(1), instrument(&[100.0; 3]), 0, ticket(Direction::Short, 5.0));
        order.buy(100.0, 1, "test").unwrap();
        order.sell(90.0, 2, "test").unwrap();
        // (900 - 1000) * -1 - 10
        assert_eq!(order.gain(), 90.0);
    }

    #[test]
    fn shares_floor_to_whole_units() {
        let mut order = Order::open(OrderId(1), instrument(&[100.0; 3]), 0, ticket(Direction::Long, 0.0));
        order.buy(110.0, 1, "test").unwrap();
        assert_eq!(order.shares(), 9.0);
    }

    #[test]
    fn transitions_are_one_way() {
        let mut order = Order::open(OrderId(1), instrument(&[100.0; 3]), 0, ticket(Direction::Long, 0.0));
        assert!(order.sell(100.0, 1, "x").is_err());
        order.buy(100.0, 1, "x").unwrap();
        assert!(order.buy(100.0, 1, "x").is_err());
        assert!(order.cancel().is_err());
        order.sell(101.0, 2, "x").unwrap();
        assert!(order.sell(101.0, 2, "x").is_err());
        assert_eq!(order.status(), OrderStatus::Closed);
    }

    #[test]
    fn cancelled_order_never_fills() {
        let mut order = Order::open(OrderId(1), instrument(&[100.0; 3]), 0, ticket(Direction::Long, 0.0));
        order.cancel().unwrap();
        assert!(order.buy(100.0, 1, "x").is_err());
        assert_eq!(order.gain(), 0.0);
        assert_eq!(order.value(), 0.0);
        assert!(order.is_finished());
    }

    #[test]
    fn zero_price_fill_buys_nothing() {
        let mut order = Order::open(OrderId(1), instrument(&[100.0; 3]), 0, ticket(Direction::Long, 0.0));
        order.buy(0.0, 1, "x").unwrap();
        assert_eq!(order.shares(), 0.0);
    }

    #[test]
    fn unpriced_sell_is_flat() {
        let mut order = Order::open(OrderId(1), instrument(&[100.0; 3]), 0, ticket(Direction::Long, 5.0));
        order.buy(100.0, 1, "x").unwrap();
        order.sell(0.0, 2, "x").unwrap();
        assert_eq!(order.sell_price(), 100.0);
        assert_eq!(order.gain(), 0.0);
    }

    #[test]
    fn value_is_long_equivalent() {
        let inst = instrument(&[100.0, 100.0, 90.0]);
        let mut short = Order::open(OrderId(1), Arc::clone(&inst), 0, ticket(Direction::Short, 0.0));
        short.buy(100.0, 1, "x").unwrap();
        short.mark_to_market(2);
        // Price fell 10 on 10 shares: short is worth cost + 100.
        assert_eq!(short.value(), 1100.0);

        let mut long = Order::open(OrderId(2), inst, 0, ticket(Direction::Long, 0.0));
        long.buy(100.0, 1, "x").unwrap();
        long.mark_to_market(2);
        assert_eq!(long.value(), 900.0);
    }

    #[test]
    fn closed_value_includes_commission() {
        let mut order = Order::open(OrderId(1), instrument(&[100.0; 3]), 0, ticket(Direction::Long, 5.0));
        order.buy(100.0, 1, "x").unwrap();
        order.sell(110.0, 2, "x").unwrap();
        assert_eq!(order.value(), 1090.0);
    }

    #[test]
    fn update_waits_for_opened_bar() {
        let mut t = ticket(Direction::Long, 0.0);
        t.buy_conditions.push(Box::new(MarketBuy::new()));
        let mut order = Order::open(OrderId(1), instrument(&[100.0, 101.0, 102.0, 103.0]), 1, t);
        assert_eq!(order.opened_bar(), 2);
        order.update(1);
        assert_eq!(order.status(), OrderStatus::Open);
        order.update(2);
        assert_eq!(order.status(), OrderStatus::Filled);
        assert_eq!(order.buy_price(), 102.0);
    }

    #[test]
    fn one_transition_per_update() {
        let mut t = ticket(Direction::Long, 0.0);
        t.buy_conditions.push(Box::new(MarketBuy::new()));
        t.sell_conditions.push(Box::new(SellAtClose { prio: 0, tag: "now" }));
        let mut order = Order::open(OrderId(1), instrument(&[100.0, 101.0, 102.0, 103.0]), 0, t);
        order.update(1);
        assert_eq!(order.status(), OrderStatus::Filled);
        order.update(2);
        assert_eq!(order.status(), OrderStatus::Closed);
        assert_eq!(order.sell_reason(), Some("now"));
    }

    #[test]
    fn lowest_priority_wins() {
        let mut t = ticket(Direction::Long, 0.0);
        t.buy_conditions.push(Box::new(MarketBuy::new()));
        t.sell_conditions.push(Box::new(SellAtClose { prio: 50, tag: "late" }));
        t.sell_conditions.push(Box::new(SellAtClose { prio: 5, tag: "early" }));
        let mut order = Order::open(OrderId(1), instrument(&[100.0; 4]), 0, t);
        assert_eq!(order.sell_conditions()[0].name(), "early");
        order.update(1);
        order.update(2);
        assert_eq!(order.sell_reason(), Some("early"));
    }

    #[test]
    fn forced_close_on_last_bar() {
        let mut t = ticket(Direction::Long, 0.0);
        t.buy_conditions.push(Box::new(MarketBuy::new()));
        t.sell_conditions.push(Box::new(MaxBarsOpen::new(10)));
        let mut order = Order::open(OrderId(1), instrument(&[100.0, 101.0, 102.0]), 0, t);
        order.update(1);
        order.update(2);
        assert_eq!(order.status(), OrderStatus::Closed);
        assert_eq!(order.sell_reason(), Some(FORCED_CLOSE));
        assert_eq!(order.sell_price(), 102.0);
    }

    #[test]
    fn forced_close_settles_like_a_sell() {
        let mut t = ticket(Direction::Short, 5.0);
        t.buy_conditions.push(Box::new(MarketBuy::new()));
        let mut order = Order::open(OrderId(1), instrument(&[100.0, 100.0, 90.0]), 0, t);
        order.update(1);
        order.update(2);
        assert_eq!(order.status(), OrderStatus::Closed);
        // 10 shares short from 100 to 90, less two commissions.
        assert_eq!(order.gain(), 90.0);
        assert_eq!(order.value(), 1090.0);
        assert!(order.sell(95.0, 2, "late").is_err());
        assert_eq!(order.sell_price(), 90.0);
        assert_eq!(order.sell_reason(), Some(FORCED_CLOSE));
    }

    #[test]
    fn unfilled_order_cancelled_on_last_bar() {
        let mut order = Order::open(OrderId(1), instrument(&[100.0, 101.0]), 0, ticket(Direction::Long, 0.0));
        order.update(1);
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.sell_reason(), Some(END_OF_DATA));
    }

    #[test]
    fn conditions_sorted_stably() {
        let mut t = ticket(Direction::Long, 0.0);
        t.sell_conditions.push(Box::new(SellAtClose { prio: priority::HARD_STOP, tag: "first" }));
        t.sell_conditions.push(Box::new(SellAtClose { prio: priority::HARD_STOP, tag: "second" }));
        let order = Order::open(OrderId(1), instrument(&[100.0; 2]), 0, t);
        let names: Vec<&str> = order.sell_conditions().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn extra_info_is_lazy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut order = Order::open(OrderId(1), instrument(&[100.0; 2]), 0, ticket(Direction::Long, 0.0));
        let counter = Arc::clone(&calls);
        order.defer_info("strategy_len", move |o| {
            counter.fetch_add(1, Ordering::SeqCst);
            Value::from(o.strategy().len())
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let record = order.to_record();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(record.extra["strategy_len"], Value::from(3));
        assert_eq!(record.ticker, "SPY");
    }
}
