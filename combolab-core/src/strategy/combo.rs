//! Per-instrument combo search.
//!
//! Each bar the engine:
//! 1. advances its tracking orders and drops the finished ones,
//! 2. collects the member signals that fired within the leeway window,
//! 3. places one tracking order per combo of same-direction signals,
//! 4. proposes the combo with the highest rolling win percent.
//!
//! Tracking orders exist only to build statistics. They never touch the
//! account.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::combos::combinations_bounded;
use crate::context::EngineContext;
use crate::domain::{Direction, Instrument};
use crate::orders::Order;
use crate::signals::{SignalError, SignalSet, SubStrategy};
use crate::stats::{OrderHandle, StrategyStatistics};

use super::rules::RuleBook;
use super::suggestion::{expectancy, Suggestion};
use super::SuggestionEngine;

#[derive(Debug)]
pub struct ComboStrategy {
    label: String,
    ctx: EngineContext,
    instrument: Arc<Instrument>,
    signals: Arc<SignalSet>,
    members: Vec<Arc<SubStrategy>>,
    rules: RuleBook,
    active: Vec<OrderHandle>,
    last_statistics: Vec<StrategyStatistics>,
}

impl ComboStrategy {
    /// Engine over `members` (names within `signals`).
    pub fn new(
        label: impl Into<String>,
        ctx: EngineContext,
        instrument: Arc<Instrument>,
        signals: Arc<SignalSet>,
        members: &[String],
    ) -> Result<Self, SignalError> {
        let members = signals.subset(members)?;
        let rules = RuleBook::new(instrument.ticker(), &ctx.config, &signals)?;
        Ok(Self {
            label: label.into(),
            ctx,
            instrument,
            signals,
            members,
            rules,
            active: Vec::new(),
            last_statistics: Vec::new(),
        })
    }

    fn advance_orders(&mut self, bar: usize) {
        for handle in &self.active {
            handle.write().update(bar);
        }
        self.active.retain(|h| !h.read().is_finished());
    }

    /// Members that fired within the leeway window, grouped by direction in
    /// member order.
    fn fired(&self, bar: usize) -> Vec<(Direction, Vec<Arc<SubStrategy>>)> {
        let leeway = self.ctx.config.combo_leeway_bars;
        let bias = if self.ctx.config.use_bias_filter {
            Some(self.signals.bias().and_then(|b| b.at(bar)))
        } else {
            None
        };

        let mut groups: Vec<(Direction, Vec<Arc<SubStrategy>>)> = Vec::new();
        for member in &self.members {
            if member.last_found_within(bar, leeway).is_none() {
                continue;
            }
            // With the filter on, a bar without a bias reading admits nothing.
            if let Some(allowed) = bias {
                if allowed != Some(member.direction) {
                    continue;
                }
            }
            match groups.iter_mut().find(|(d, _)| *d == member.direction) {
                Some((_, group)) => group.push(Arc::clone(member)),
                None => groups.push((member.direction, vec![Arc::clone(member)])),
            }
        }
        groups
    }

    fn place(&mut self, bar: usize, direction: Direction, combo: &[Arc<SubStrategy>]) -> (String, Vec<String>) {
        let name = combo.iter().map(|m| m.name.as_str()).collect::<Vec<_>>().join("-");
        let mut indicators: Vec<String> = Vec::new();
        for member in combo {
            for ind in &member.dependent_indicators {
                if !indicators.contains(ind) {
                    indicators.push(ind.clone());
                }
            }
        }

        let ticket = self
            .rules
            .ticket(name.clone(), direction, combo, indicators.clone(), &self.signals);
        let id = self.ctx.ids.next_order_id();
        let mut order = Order::open(id, Arc::clone(&self.instrument), bar, ticket);

        let leeway = self.ctx.config.combo_leeway_bars;
        let signal_bars: Map<String, Value> = combo
            .iter()
            .map(|m| (m.name.clone(), Value::from(m.last_found_within(bar, leeway))))
            .collect();
        order.defer_info("signal_bars", move |_| Value::Object(signal_bars.clone()));
        defer_indicator_readings(&mut order, &self.signals, &indicators);

        let handle: OrderHandle = Arc::new(RwLock::new(order));
        self.ctx.history.add_order(&handle, &indicators, bar);
        self.active.push(handle);
        trace!(ticker = self.instrument.ticker(), combo = %name, %id, "tracking order placed");
        (name, indicators)
    }
}

/// Record the readings of `indicators` on the bar the order fills, evaluated
/// at export. Missing readings and unfilled orders export as null.
pub(crate) fn defer_indicator_readings(order: &mut Order, signals: &Arc<SignalSet>, indicators: &[String]) {
    let signals = Arc::clone(signals);
    let names = indicators.to_vec();
    order.defer_info("indicators_at_entry", move |o| {
        let readings: Map<String, Value> = names
            .iter()
            .map(|name| {
                let reading = o
                    .buy_bar()
                    .and_then(|b| signals.indicator(name).and_then(|series| series.value(b)));
                (name.clone(), reading.map_or(Value::Null, Value::from))
            })
            .collect();
        Value::Object(readings)
    });
}

impl SuggestionEngine for ComboStrategy {
    fn label(&self) -> &str {
        &self.label
    }

    fn evaluate(&mut self, bar: usize) -> Option<Suggestion> {
        self.advance_orders(bar);
        self.last_statistics.clear();

        let config = Arc::clone(&self.ctx.config);
        let history = Arc::clone(&self.ctx.history);
        let ticker = self.instrument.ticker().to_string();
        let mut best: Option<Suggestion> = None;

        for (direction, group) in self.fired(bar) {
            for combo in combinations_bounded(&group, config.min_combo_size, config.max_combo_size) {
                let (name, indicators) = self.place(bar, direction, &combo);
                let stats =
                    history.strategy_statistics(&name, Some(direction), &ticker, bar, config.max_lookback_bars);

                let better = best
                    .as_ref()
                    .map_or(true, |b| stats.win_percent > b.highest_percent);
                if better {
                    let ticket = self
                        .rules
                        .ticket(name.clone(), direction, &combo, indicators.clone(), &self.signals);
                    best = Some(Suggestion {
                        ticker: ticker.clone(),
                        name,
                        direction,
                        highest_percent: stats.win_percent,
                        gain: stats.gain,
                        size: config.order_size,
                        indicators,
                        expected_gain: expectancy(&stats),
                        statistics: stats.clone(),
                        ticket,
                    });
                }
                if !config.abbreviated_reporting {
                    self.last_statistics.push(stats);
                }
            }
        }

        if config.abbreviated_reporting {
            if let Some(b) = &best {
                self.last_statistics.push(b.statistics.clone());
            }
        }
        if let Some(b) = &best {
            debug!(ticker = %ticker, engine = %self.label, bar, combo = %b.name, win = b.highest_percent, "suggestion");
        }
        best
    }

    fn last_statistics(&self) -> &[StrategyStatistics] {
        &self.last_statistics
    }

    fn active_orders(&self) -> usize {
        self.active.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::orders::conditions::test_support::{flat, instrument};
    use crate::orders::{OrderStatus, FORCED_CLOSE};
    use crate::signals::{BiasSeries, IndicatorSeries, StrategyDefinition, StrategyRegistry};
    use std::collections::HashMap;

    fn def(name: &str, direction: Direction, indicators: &[&str]) -> StrategyDefinition {
        StrategyDefinition {
            name: name.into(),
            direction,
            counterpart: None,
            dependent_indicators: indicators.iter().map(|s| s.to_string()).collect(),
            requires: vec![],
        }
    }

    fn engine(
        cfg: SimulationConfig,
        bars: usize,
        defs: Vec<StrategyDefinition>,
        found: Vec<(&str, Vec<bool>)>,
        bias: Option<BiasSeries>,
    ) -> ComboStrategy {
        let names: Vec<String> = defs.iter().map(|d| d.name.clone()).collect();
        let registry = StrategyRegistry::new(defs).unwrap();
        let found: HashMap<String, Vec<bool>> = found.into_iter().map(|(n, f)| (n.to_string(), f)).collect();
        let set = SignalSet::build("TEST", bars, &registry, &names, found, vec![], bias).unwrap();
        let ctx = EngineContext::new(cfg).unwrap();
        ComboStrategy::new("root", ctx, instrument(&flat(100.0, bars)), Arc::new(set), &names).unwrap()
    }

    fn fires_at(n: usize, bars: &[usize]) -> Vec<bool> {
        (0..n).map(|i| bars.contains(&i)).collect()
    }

    #[test]
    fn single_signal_lifecycle() {
        let mut eng = engine(
            SimulationConfig::default(),
            5,
            vec![def("a", Direction::Long, &["sma"])],
            vec![("a", fires_at(5, &[2]))],
            None,
        );
        assert!(eng.evaluate(0).is_none());
        assert!(eng.evaluate(1).is_none());
        let s = eng.evaluate(2).unwrap();
        assert_eq!(s.name, "a");
        assert_eq!(s.highest_percent, 0.0);
        assert_eq!(s.indicators, vec!["sma".to_string()]);
        assert_eq!(eng.active_orders(), 1);

        let handle = Arc::clone(&eng.active[0]);
        assert!(eng.evaluate(3).is_none());
        assert_eq!(handle.read().status(), OrderStatus::Filled);
        assert_eq!(handle.read().buy_bar(), Some(3));
        eng.evaluate(4);
        let order = handle.read();
        assert_eq!(order.status(), OrderStatus::Closed);
        assert_eq!(order.sell_reason(), Some(FORCED_CLOSE));
        assert_eq!(eng.active_orders(), 0);
        assert_eq!(eng.ctx.history.strategy_order_count("a"), 1);
    }

    #[test]
    fn tracking_orders_carry_diagnostics() {
        let registry = StrategyRegistry::new(vec![def("a", Direction::Long, &["osc"])]).unwrap();
        let found = HashMap::from([("a".to_string(), fires_at(5, &[1]))]);
        let osc = IndicatorSeries::new("osc", vec![10.0, 20.0, 30.0, f64::NAN, 50.0]);
        let set = SignalSet::build("TEST", 5, &registry, &["a".to_string()], found, vec![osc], None).unwrap();
        let ctx = EngineContext::new(SimulationConfig {
            combo_leeway_bars: 1,
            ..SimulationConfig::default()
        })
        .unwrap();
        let mut eng =
            ComboStrategy::new("root", ctx, instrument(&flat(100.0, 5)), Arc::new(set), &["a".to_string()]).unwrap();

        eng.evaluate(1);
        eng.evaluate(2);
        assert_eq!(eng.active_orders(), 2);

        // Placed on bar 1, filled on bar 2.
        eng.evaluate(3);
        let first = eng.active[0].read().to_record();
        assert_eq!(first.extra["signal_bars"]["a"], Value::from(1));
        assert_eq!(first.extra["indicators_at_entry"]["osc"], Value::from(30.0));

        // Placed on bar 2 through leeway, filled on bar 3 where the reading is missing.
        let second = eng.active[1].read().to_record();
        assert_eq!(second.extra["signal_bars"]["a"], Value::from(1));
        assert_eq!(second.extra["indicators_at_entry"]["osc"], Value::Null);
    }

    #[test]
    fn combos_per_direction() {
        let mut eng = engine(
            SimulationConfig {
                max_combo_size: 2,
                ..SimulationConfig::default()
            },
            6,
            vec![
                def("a", Direction::Long, &["x"]),
                def("b", Direction::Long, &["x", "y"]),
                def("c", Direction::Long, &[]),
                def("s", Direction::Short, &[]),
            ],
            vec![
                ("a", fires_at(6, &[1])),
                ("b", fires_at(6, &[1])),
                ("c", fires_at(6, &[1])),
                ("s", fires_at(6, &[1])),
            ],
            None,
        );
        eng.evaluate(1);
        // Longs: a, b, c, a-b, a-c, b-c (a-b-c exceeds the max). Short: s.
        assert_eq!(eng.active_orders(), 7);
        assert_eq!(eng.ctx.history.strategy_order_count("a-b"), 1);
        assert_eq!(eng.ctx.history.strategy_order_count("a-b-c"), 0);
        assert_eq!(eng.ctx.history.strategy_order_count("s"), 1);

        let ab = eng.active.iter().find(|h| h.read().strategy() == "a-b").unwrap();
        assert_eq!(ab.read().dependent_indicators(), ["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn wide_firing_respects_max_size() {
        let names: Vec<String> = (0..22).map(|i| format!("s{i:02}")).collect();
        let defs = names.iter().map(|n| def(n, Direction::Long, &[])).collect();
        let found = names.iter().map(|n| (n.as_str(), vec![true; 3])).collect();
        let mut eng = engine(
            SimulationConfig {
                max_combo_size: 2,
                ..SimulationConfig::default()
            },
            3,
            defs,
            found,
            None,
        );
        eng.evaluate(0);
        // 22 singles plus C(22, 2) pairs.
        assert_eq!(eng.active_orders(), 22 + 231);
        assert_eq!(eng.ctx.history.strategy_order_count("s00-s01-s02"), 0);
    }

    #[test]
    fn leeway_extends_signal() {
        let mut eng = engine(
            SimulationConfig {
                combo_leeway_bars: 2,
                ..SimulationConfig::default()
            },
            8,
            vec![def("a", Direction::Long, &[])],
            vec![("a", fires_at(8, &[1]))],
            None,
        );
        assert!(eng.evaluate(1).is_some());
        assert!(eng.evaluate(2).is_some());
        assert!(eng.evaluate(3).is_some());
        assert!(eng.evaluate(4).is_none());
    }

    #[test]
    fn bias_filter_drops_disagreeing_signals() {
        use Direction::{Long, Short};
        let mut eng = engine(
            SimulationConfig {
                use_bias_filter: true,
                ..SimulationConfig::default()
            },
            4,
            vec![def("a", Long, &[]), def("s", Short, &[])],
            vec![("a", fires_at(4, &[1, 2])), ("s", fires_at(4, &[1, 2]))],
            Some(BiasSeries::new(vec![None, Some(Short), None, None])),
        );
        let s = eng.evaluate(1).unwrap();
        assert_eq!(s.name, "s");
        assert_eq!(eng.active_orders(), 1);
        assert!(eng.evaluate(2).is_none());
    }

    #[test]
    fn abbreviated_reporting_keeps_best_only() {
        let defs = || vec![def("a", Direction::Long, &[]), def("b", Direction::Long, &[])];
        let found = || vec![("a", fires_at(4, &[1])), ("b", fires_at(4, &[1]))];

        let mut short = engine(SimulationConfig::default(), 4, defs(), found(), None);
        short.evaluate(1);
        assert_eq!(short.last_statistics().len(), 1);

        let mut full = engine(
            SimulationConfig {
                abbreviated_reporting: false,
                ..SimulationConfig::default()
            },
            4,
            defs(),
            found(),
            None,
        );
        full.evaluate(1);
        assert_eq!(full.last_statistics().len(), 3);
    }
}
