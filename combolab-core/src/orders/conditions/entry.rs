//! Entry conditions: market fill at the next open, or a limit fill.

use crate::domain::Direction;
use crate::orders::condition::{priority, BuyCondition};
use crate::orders::order::Order;

/// Fill at the open of the first bar the order may act on.
#[derive(Debug, Clone, Default)]
pub struct MarketBuy;

impl MarketBuy {
    pub fn new() -> Self {
        Self
    }
}

impl BuyCondition for MarketBuy {
    fn name(&self) -> &str {
        "market"
    }

    fn priority(&self) -> i32 {
        priority::ENTRY
    }

    fn on_update(&mut self, order: &mut Order, bar: usize) -> bool {
        let open = order.instrument().open(bar);
        if open <= 0.0 {
            return false;
        }
        order.buy(open, bar, "market").is_ok()
    }

    fn boxed_clone(&self) -> Box<dyn BuyCondition> {
        Box::new(self.clone())
    }
}

/// Limit entry offset from the signal bar's close.
///
/// Longs rest below the reference close, shorts above it. The limit is
/// rounded to the instrument's tick size. An unfilled limit is cancelled
/// once `expire_bars` bars have passed.
#[derive(Debug, Clone)]
pub struct LimitBuy {
    offset_percent: f64,
    expire_bars: usize,
    limit: f64,
    direction: Direction,
    opened_bar: usize,
}

impl LimitBuy {
    pub fn new(offset_percent: f64, expire_bars: usize) -> Self {
        Self {
            offset_percent,
            expire_bars,
            limit: 0.0,
            direction: Direction::Long,
            opened_bar: 0,
        }
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }
}

impl BuyCondition for LimitBuy {
    fn name(&self) -> &str {
        "limit"
    }

    fn priority(&self) -> i32 {
        priority::ENTRY
    }

    fn on_open(&mut self, order: &Order) {
        self.direction = order.direction();
        self.opened_bar = order.opened_bar();
        let inst = order.instrument();
        let reference = inst.close(order.opened_bar().saturating_sub(1));
        let offset = self.offset_percent / 100.0 * self.direction.multiplier();
        self.limit = inst.round_to_tick(reference * (1.0 - offset));
    }

    fn on_update(&mut self, order: &mut Order, bar: usize) -> bool {
        if bar >= self.opened_bar + self.expire_bars {
            return order.cancel().is_ok();
        }
        if self.limit <= 0.0 {
            return false;
        }

        let inst = order.instrument();
        let (open, high, low) = (inst.open(bar), inst.high(bar), inst.low(bar));
        let fill = match self.direction {
            Direction::Long if low > 0.0 && low <= self.limit => open.min(self.limit),
            Direction::Short if high >= self.limit => open.max(self.limit),
            _ => return false,
        };
        order.buy(fill, bar, "limit").is_ok()
    }

    fn boxed_clone(&self) -> Box<dyn BuyCondition> {
        Box::new(self.clone())
    }
}
