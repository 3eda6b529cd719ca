//! Buy/sell condition protocol.
//!
//! A condition encodes one entry or exit rule. It is opened against an order
//! once (`on_open`) and then polled every bar (`on_update`). A condition that
//! decides to act calls `Order::buy` / `Order::sell` itself and returns true;
//! the order stops polling the remaining conditions for that bar.
//!
//! Conditions never talk to each other. Lower priority values are evaluated
//! first and therefore win ties.

use std::fmt;

use super::order::Order;

/// Evaluation priorities. Hard stops and time limits come before
/// discretionary exits.
pub mod priority {
    pub const ENTRY: i32 = 0;
    pub const HARD_STOP: i32 = 0;
    pub const TIME_IN_MARKET: i32 = 10;
    pub const PROFIT_TARGET: i32 = 20;
    pub const OPPOSITE_SIGNAL: i32 = 30;
    pub const CONSOLIDATION: i32 = 40;
    pub const OSCILLATOR: i32 = 50;
    pub const TRAILING: i32 = 60;
    pub const BIAS_FLIP: i32 = 70;
}

/// Entry rule polled while the order is `Open`.
pub trait BuyCondition: fmt::Debug + Send + Sync {
    /// Short identifier used as the fill reason.
    fn name(&self) -> &str;

    fn priority(&self) -> i32;

    /// Called once when the order is created.
    fn on_open(&mut self, _order: &Order) {}

    /// Returns true if this condition filled the order on `bar`.
    fn on_update(&mut self, order: &mut Order, bar: usize) -> bool;

    /// Fresh copy for a new order.
    fn boxed_clone(&self) -> Box<dyn BuyCondition>;
}

/// Exit rule polled while the order is `Filled`.
pub trait SellCondition: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn priority(&self) -> i32;

    fn on_open(&mut self, _order: &Order) {}

    /// Returns true if this condition closed the order on `bar`.
    fn on_update(&mut self, order: &mut Order, bar: usize) -> bool;

    fn boxed_clone(&self) -> Box<dyn SellCondition>;
}

impl Clone for Box<dyn BuyCondition> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

impl Clone for Box<dyn SellCondition> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}
