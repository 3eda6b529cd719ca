//! Trailing channel stop on the prior `lookback` bars' extremes.

use crate::domain::Direction;
use crate::orders::condition::{priority, SellCondition};
use crate::orders::order::Order;

use super::{bars_held, sell_at_close};

#[derive(Debug, Clone)]
pub struct TrailingChannel {
    lookback: usize,
}

impl TrailingChannel {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback: lookback.max(1),
        }
    }
}

impl SellCondition for TrailingChannel {
    fn name(&self) -> &str {
        "trailing channel"
    }

    fn priority(&self) -> i32 {
        priority::TRAILING
    }

    fn on_update(&mut self, order: &mut Order, bar: usize) -> bool {
        if !matches!(bars_held(order, bar), Some(h) if h >= 1) || bar < self.lookback {
            return false;
        }
        let inst = order.instrument();
        let window = bar - self.lookback..bar;
        let close = inst.close(bar);

        let broken = match order.direction() {
            Direction::Long => {
                let floor = window.map(|b| inst.low(b)).fold(f64::INFINITY, f64::min);
                close < floor
            }
            Direction::Short => {
                let ceiling = window.map(|b| inst.high(b)).fold(f64::NEG_INFINITY, f64::max);
                close > ceiling
            }
        };
        broken && sell_at_close(order, bar, "trailing channel")
    }

    fn boxed_clone(&self) -> Box<dyn SellCondition> {
        Box::new(self.clone())
    }
}
