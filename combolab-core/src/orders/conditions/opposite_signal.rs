//! Close when a member's inverse counterpart fires.

use std::sync::Arc;

use crate::orders::condition::{priority, SellCondition};
use crate::orders::order::Order;
use crate::signals::SubStrategy;

use super::sell_at_close;

#[derive(Debug, Clone)]
pub struct OppositeSignal {
    label: String,
    counterpart: Arc<SubStrategy>,
}

impl OppositeSignal {
    /// `member` is the combo member whose counterpart is watched.
    pub fn new(member: &str, counterpart: Arc<SubStrategy>) -> Self {
        Self {
            label: format!("opposite:{member}"),
            counterpart,
        }
    }

    pub fn counterpart(&self) -> &str {
        &self.counterpart.name
    }
}

impl SellCondition for OppositeSignal {
    fn name(&self) -> &str {
        &self.label
    }

    fn priority(&self) -> i32 {
        priority::OPPOSITE_SIGNAL
    }

    fn on_update(&mut self, order: &mut Order, bar: usize) -> bool {
        if !self.counterpart.found_at(bar) {
            return false;
        }
        sell_at_close(order, bar, &self.label)
    }

    fn boxed_clone(&self) -> Box<dyn SellCondition> {
        Box::new(self.clone())
    }
}
