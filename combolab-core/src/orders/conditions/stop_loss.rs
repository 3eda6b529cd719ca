//! Hard stop-loss, by percent of the fill price or by an absolute distance.
//!
//! For longs the stop sits below the fill, for shorts above it. If the bar
//! gaps through the stop, the exit happens at the open.

use crate::domain::Direction;
use crate::orders::condition::{priority, SellCondition};
use crate::orders::order::Order;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Distance {
    Percent(f64),
    Absolute(f64),
}

#[derive(Debug, Clone)]
pub struct StopLoss {
    distance: Distance,
}

impl StopLoss {
    /// Stop `percent`% away from the fill price (e.g. 5.0 for 5%).
    pub fn percent(percent: f64) -> Self {
        Self {
            distance: Distance::Percent(percent),
        }
    }

    /// Stop a fixed price distance away from the fill price.
    pub fn value(distance: f64) -> Self {
        Self {
            distance: Distance::Absolute(distance),
        }
    }

    /// Stop price for an order filled at `buy_price`.
    pub fn stop_price(&self, direction: Direction, buy_price: f64) -> f64 {
        let distance = match self.distance {
            Distance::Percent(p) => buy_price * p / 100.0,
            Distance::Absolute(v) => v,
        };
        buy_price - distance * direction.multiplier()
    }
}

impl SellCondition for StopLoss {
    fn name(&self) -> &str {
        match self.distance {
            Distance::Percent(_) => "stop loss",
            Distance::Absolute(_) => "stop loss value",
        }
    }

    fn priority(&self) -> i32 {
        priority::HARD_STOP
    }

    fn on_update(&mut self, order: &mut Order, bar: usize) -> bool {
        let stop = self.stop_price(order.direction(), order.buy_price());
        let inst = order.instrument();
        let (open, high, low) = (inst.open(bar), inst.high(bar), inst.low(bar));
        if open <= 0.0 {
            return false;
        }

        let fill = match order.direction() {
            Direction::Long if low <= stop => open.min(stop),
            Direction::Short if high >= stop => open.max(stop),
            _ => return false,
        };
        let reason = self.name().to_string();
        order.sell(fill, bar, &reason).is_ok()
    }

    fn boxed_clone(&self) -> Box<dyn SellCondition> {
        Box::new(self.clone())
    }
}
