//! Account bookkeeping for orders placed with real capital.
//!
//! Owned by the control loop and never shared with workers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::orders::{Order, OrderRecord, OrderStatus};

/// One point of the account value series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub cash: f64,
    pub value: f64,
}

#[derive(Debug)]
pub struct Account {
    cash: f64,
    value: f64,
    active: Vec<Order>,
    finished: Vec<OrderRecord>,
    series: Vec<ValuePoint>,
}

impl Account {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            value: initial_cash,
            active: Vec::new(),
            finished: Vec::new(),
            series: Vec::new(),
        }
    }

    /// Update every active order for `date`, reconcile cash, drop finished
    /// orders and append the new account value to the series.
    ///
    /// Orders whose instrument has no bar on `date` are left untouched.
    pub fn maintain(&mut self, date: NaiveDate) -> f64 {
        for order in &mut self.active {
            let Some(bar) = order.instrument().bar_index(date) else {
                continue;
            };
            let before = order.status();
            order.update(bar);
            let after = order.status();
            self.cash += cash_delta(order, before, after);
        }

        let (done, still_active): (Vec<Order>, Vec<Order>) =
            std::mem::take(&mut self.active).into_iter().partition(Order::is_finished);
        self.active = still_active;
        self.finished.extend(done.iter().map(Order::to_record));

        self.value = self.cash + self.active.iter().map(Order::value).sum::<f64>();
        self.series.push(ValuePoint {
            date,
            cash: self.cash,
            value: self.value,
        });
        self.value
    }

    /// Take ownership of a freshly opened order. Cash moves only when it
    /// fills.
    pub fn submit(&mut self, order: Order) {
        self.active.push(order);
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn active(&self) -> &[Order] {
        &self.active
    }

    pub fn finished(&self) -> &[OrderRecord] {
        &self.finished
    }

    pub fn series(&self) -> &[ValuePoint] {
        &self.series
    }

    pub fn into_parts(self) -> (Vec<OrderRecord>, Vec<OrderRecord>, Vec<ValuePoint>) {
        let open = self.active.iter().map(Order::to_record).collect();
        (self.finished, open, self.series)
    }
}

/// Cash movement caused by one status transition.
fn cash_delta(order: &Order, before: OrderStatus, after: OrderStatus) -> f64 {
    match (before, after) {
        (OrderStatus::Open, OrderStatus::Filled) => -(order.shares() * order.buy_price()),
        (OrderStatus::Open, s) if s.is_finished() => order.gain(),
        (OrderStatus::Filled, s) if s.is_finished() => order.value(),
        _ => 0.0,
    }
}
