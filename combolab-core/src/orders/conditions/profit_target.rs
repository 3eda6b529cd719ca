//! Exit once price moves `percent`% in the trade's favour.

use crate::domain::Direction;
use crate::orders::condition::{priority, SellCondition};
use crate::orders::order::Order;

#[derive(Debug, Clone)]
pub struct ProfitTarget {
    percent: f64,
}

impl ProfitTarget {
    pub fn new(percent: f64) -> Self {
        Self { percent }
    }
}

impl SellCondition for ProfitTarget {
    fn name(&self) -> &str {
        "profit target"
    }

    fn priority(&self) -> i32 {
        priority::PROFIT_TARGET
    }

    fn on_update(&mut self, order: &mut Order, bar: usize) -> bool {
        let dir = order.direction();
        let target = order.buy_price() * (1.0 + self.percent / 100.0 * dir.multiplier());
        let inst = order.instrument();
        let (open, high, low) = (inst.open(bar), inst.high(bar), inst.low(bar));
        if open <= 0.0 {
            return false;
        }

        let fill = match dir {
            Direction::Long if high >= target => open.max(target),
            Direction::Short if low <= target => open.min(target),
            _ => return false,
        };
        order.sell(fill, bar, "profit target").is_ok()
    }

    fn boxed_clone(&self) -> Box<dyn SellCondition> {
        Box::new(self.clone())
    }
}
