//! No-movement stop: exit a position that has gone nowhere.

use crate::orders::condition::{priority, SellCondition};
use crate::orders::order::Order;

use super::{bars_held, sell_at_close};

/// Fires once the order has been held for `lookback` bars and the closes
/// over the last `lookback` bars span less than `threshold_percent` of the
/// fill price.
#[derive(Debug, Clone)]
pub struct NoMovement {
    lookback: usize,
    threshold_percent: f64,
}

impl NoMovement {
    pub fn new(lookback: usize, threshold_percent: f64) -> Self {
        Self {
            lookback: lookback.max(1),
            threshold_percent,
        }
    }
}

impl SellCondition for NoMovement {
    fn name(&self) -> &str {
        "no movement"
    }

    fn priority(&self) -> i32 {
        priority::CONSOLIDATION
    }

    fn on_update(&mut self, order: &mut Order, bar: usize) -> bool {
        match bars_held(order, bar) {
            Some(held) if held >= self.lookback => {}
            _ => return false,
        }
        let buy = order.buy_price();
        if buy <= 0.0 {
            return false;
        }

        let inst = order.instrument();
        let start = (bar + 1).saturating_sub(self.lookback);
        let (lo, hi) = (start..=bar)
            .map(|b| inst.close(b))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| (lo.min(c), hi.max(c)));
        let range_percent = (hi - lo) / buy * 100.0;

        if range_percent < self.threshold_percent {
            sell_at_close(order, bar, "no movement")
        } else {
            false
        }
    }

    fn boxed_clone(&self) -> Box<dyn SellCondition> {
        Box::new(self.clone())
    }
}
