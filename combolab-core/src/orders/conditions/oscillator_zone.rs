//! Oscillator zone reversal.
//!
//! A long exits when the oscillator drops back below the upper band after
//! being at or above it; a short exits on the mirrored move through the
//! lower band.

use std::sync::Arc;

use crate::domain::Direction;
use crate::orders::condition::{priority, SellCondition};
use crate::orders::order::Order;
use crate::signals::IndicatorSeries;

use super::sell_at_close;

#[derive(Debug, Clone)]
pub struct OscillatorZone {
    series: Arc<IndicatorSeries>,
    upper: f64,
    lower: f64,
}

impl OscillatorZone {
    pub fn new(series: Arc<IndicatorSeries>, upper: f64, lower: f64) -> Self {
        Self {
            series,
            upper,
            lower,
        }
    }

    fn left_zone(&self, direction: Direction, bar: usize) -> bool {
        if bar == 0 {
            return false;
        }
        let (Some(prev), Some(cur)) = (self.series.value(bar - 1), self.series.value(bar)) else {
            return false;
        };
        match direction {
            Direction::Long => prev >= self.upper && cur < self.upper,
            Direction::Short => prev <= self.lower && cur > self.lower,
        }
    }
}

impl SellCondition for OscillatorZone {
    fn name(&self) -> &str {
        "oscillator zone"
    }

    fn priority(&self) -> i32 {
        priority::OSCILLATOR
    }

    fn on_update(&mut self, order: &mut Order, bar: usize) -> bool {
        if !self.left_zone(order.direction(), bar) {
            return false;
        }
        sell_at_close(order, bar, "oscillator zone")
    }

    fn boxed_clone(&self) -> Box<dyn SellCondition> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::conditions::test_support::{filled, flat, instrument};
    use crate::orders::order::OrderStatus;

    fn rsi(values: Vec<f64>) -> Arc<IndicatorSeries> {
        Arc::new(IndicatorSeries::new("rsi_14", values))
    }

    #[test]
    fn long_exits_falling_out_of_overbought() {
        let cond = OscillatorZone::new(rsi(vec![50.0, 60.0, 75.0, 68.0, 60.0, 55.0]), 70.0, 30.0);
        let mut order = filled(instrument(&flat(20.0, 6)), Direction::Long, 20.0, 1, Box::new(cond));
        order.update(2);
        assert_eq!(order.status(), OrderStatus::Filled);
        order.update(3);
        assert_eq!(order.status(), OrderStatus::Closed);
        assert_eq!(order.sell_bar(), Some(3));
    }

    #[test]
    fn short_exits_rising_out_of_oversold() {
        let cond = OscillatorZone::new(rsi(vec![50.0, 40.0, 25.0, 28.0, 35.0, 40.0]), 70.0, 30.0);
        let mut order = filled(instrument(&flat(20.0, 6)), Direction::Short, 20.0, 1, Box::new(cond));
        order.update(2);
        order.update(3);
        assert_eq!(order.status(), OrderStatus::Filled);
        order.update(4);
        assert_eq!(order.status(), OrderStatus::Closed);
    }

    #[test]
    fn missing_readings_never_fire() {
        let cond = OscillatorZone::new(rsi(vec![f64::NAN, 80.0, f64::NAN, 10.0, 20.0, 30.0]), 70.0, 30.0);
        let mut order = filled(instrument(&flat(20.0, 6)), Direction::Long, 20.0, 1, Box::new(cond));
        order.update(2);
        order.update(3);
        assert_eq!(order.status(), OrderStatus::Filled);
    }
}
