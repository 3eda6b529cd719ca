use serde::{Deserialize, Serialize};

use crate::orders::{Order, OrderRecord};

/// Win/loss summary over a filtered set of closed orders.
///
/// A record built from too few orders is empty: every counter is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyStatistics {
    pub name: String,
    pub number_of_orders: usize,
    pub wins: usize,
    pub losses: usize,
    /// Rounded to a whole percent.
    pub win_percent: f64,
    pub loss_percent: f64,
    pub gain: f64,
    pub average_win: f64,
    pub average_loss: f64,
}

impl StrategyStatistics {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.number_of_orders == 0
    }
}

/// Statistics plus the accepted orders, for export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedStatistics {
    pub statistics: StrategyStatistics,
    pub orders: Vec<OrderRecord>,
}

/// Running totals while scanning history.
#[derive(Debug, Default)]
pub struct StatisticsAccumulator {
    wins: usize,
    losses: usize,
    win_gain: f64,
    loss_gain: f64,
}

impl StatisticsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a closed order. Gain above zero is a win, anything else a loss.
    pub fn accept(&mut self, order: &Order) {
        let gain = order.gain();
        if gain > 0.0 {
            self.wins += 1;
            self.win_gain += gain;
        } else {
            self.losses += 1;
            self.loss_gain += gain;
        }
    }

    pub fn count(&self) -> usize {
        self.wins + self.losses
    }

    /// Finish the record. Samples of `min_required` orders or fewer yield
    /// an empty record.
    pub fn finish(self, name: impl Into<String>, min_required: usize) -> StrategyStatistics {
        let total = self.count();
        if total == 0 || total <= min_required {
            return StrategyStatistics::empty(name);
        }
        let pct = |n: usize| (100.0 * n as f64 / total as f64).round();
        let avg = |sum: f64, n: usize| if n == 0 { 0.0 } else { sum / n as f64 };

        StrategyStatistics {
            name: name.into(),
            number_of_orders: total,
            wins: self.wins,
            losses: self.losses,
            win_percent: pct(self.wins),
            loss_percent: pct(self.losses),
            gain: self.win_gain + self.loss_gain,
            average_win: avg(self.win_gain, self.wins),
            average_loss: avg(self.loss_gain, self.losses),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, OrderId};
    use crate::orders::conditions::test_support::{flat, instrument};
    use crate::orders::OrderTicket;

    fn closed(gain_per_share: f64) -> Order {
        let ticket = OrderTicket {
            strategy: "x".into(),
            direction: Direction::Long,
            size: 1000.0,
            commission: 0.0,
            dependent_indicators: vec![],
            buy_conditions: vec![],
            sell_conditions: vec![],
        };
        let mut order = Order::open(OrderId(1), instrument(&flat(100.0, 3)), 0, ticket);
        order.buy(100.0, 1, "t").unwrap();
        order.sell(100.0 + gain_per_share, 2, "t").unwrap();
        order
    }

    #[test]
    fn percentages_round() {
        let mut acc = StatisticsAccumulator::new();
        acc.accept(&closed(1.0));
        acc.accept(&closed(2.0));
        acc.accept(&closed(-1.0));
        let stats = acc.finish("x", 0);
        assert_eq!(stats.number_of_orders, 3);
        assert_eq!(stats.win_percent, 67.0);
        assert_eq!(stats.loss_percent, 33.0);
        assert_eq!(stats.gain, 20.0);
        assert_eq!(stats.average_win, 15.0);
        assert_eq!(stats.average_loss, -10.0);
    }

    #[test]
    fn flat_trade_is_a_loss() {
        let mut acc = StatisticsAccumulator::new();
        acc.accept(&closed(0.0));
        let stats = acc.finish("x", 0);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.win_percent, 0.0);
    }

    #[test]
    fn below_minimum_is_empty() {
        let mut acc = StatisticsAccumulator::new();
        acc.accept(&closed(5.0));
        acc.accept(&closed(5.0));
        let stats = acc.finish("x", 2);
        assert!(stats.is_empty());
        assert_eq!(stats.win_percent, 0.0);
        assert_eq!(stats.loss_percent, 0.0);
        assert_eq!(stats.name, "x");
    }
}
