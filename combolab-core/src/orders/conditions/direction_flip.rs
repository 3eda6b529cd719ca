//! Exit once the higher-timeframe bias turns against the position.

use std::sync::Arc;

use crate::orders::condition::{priority, SellCondition};
use crate::orders::order::Order;
use crate::signals::BiasSeries;

use super::{bars_held, sell_at_close};

#[derive(Debug, Clone)]
pub struct DirectionFlip {
    bias: Arc<BiasSeries>,
    min_bars: usize,
}

impl DirectionFlip {
    pub fn new(bias: Arc<BiasSeries>, min_bars: usize) -> Self {
        Self { bias, min_bars }
    }
}

impl SellCondition for DirectionFlip {
    fn name(&self) -> &str {
        "direction flip"
    }

    fn priority(&self) -> i32 {
        priority::BIAS_FLIP
    }

    fn on_update(&mut self, order: &mut Order, bar: usize) -> bool {
        match bars_held(order, bar) {
            Some(held) if held >= self.min_bars => {}
            _ => return false,
        }
        if self.bias.at(bar) != Some(order.direction().opposite()) {
            return false;
        }
        sell_at_close(order, bar, "direction flip")
    }

    fn boxed_clone(&self) -> Box<dyn SellCondition> {
        Box::new(self.clone())
    }
}
