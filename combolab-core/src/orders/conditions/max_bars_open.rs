//! Time-in-market exit at the close.

use crate::orders::condition::{priority, SellCondition};
use crate::orders::order::Order;

use super::{bars_held, sell_at_close};

#[derive(Debug, Clone)]
pub struct MaxBarsOpen {
    max_bars: usize,
}

impl MaxBarsOpen {
    pub fn new(max_bars: usize) -> Self {
        Self { max_bars }
    }
}

impl SellCondition for MaxBarsOpen {
    fn name(&self) -> &str {
        "max bars open"
    }

    fn priority(&self) -> i32 {
        priority::TIME_IN_MARKET
    }

    fn on_update(&mut self, order: &mut Order, bar: usize) -> bool {
        match bars_held(order, bar) {
            Some(held) if held >= self.max_bars => sell_at_close(order, bar, "max bars open"),
            _ => false,
        }
    }

    fn boxed_clone(&self) -> Box<dyn SellCondition> {
        Box::new(self.clone())
    }
}
