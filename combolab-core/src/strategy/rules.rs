//! Builds the buy and sell conditions attached to every combo order.

use std::sync::Arc;

use crate::config::{EntryRule, SellRule, SimulationConfig};
use crate::domain::Direction;
use crate::orders::conditions::{
    DirectionFlip, LimitBuy, MarketBuy, MaxBarsOpen, NoMovement, OppositeSignal, OscillatorZone, ProfitTarget,
    StopLoss, TrailingChannel,
};
use crate::orders::{BuyCondition, OrderTicket, SellCondition};
use crate::signals::{SignalError, SignalSet, SubStrategy};

/// Condition templates for one instrument.
///
/// Series referenced by configured sell rules are resolved once, at
/// construction. A rule naming an indicator the instrument does not carry is
/// an error.
#[derive(Debug, Clone)]
pub struct RuleBook {
    entry: Box<dyn BuyCondition>,
    exits: Vec<Box<dyn SellCondition>>,
    size: f64,
    commission: f64,
}

impl RuleBook {
    pub fn new(ticker: &str, config: &SimulationConfig, signals: &SignalSet) -> Result<Self, SignalError> {
        let entry: Box<dyn BuyCondition> = match config.entry {
            EntryRule::Market => Box::new(MarketBuy::new()),
            EntryRule::Limit {
                offset_percent,
                expire_bars,
            } => Box::new(LimitBuy::new(offset_percent, expire_bars)),
        };

        let mut exits: Vec<Box<dyn SellCondition>> = vec![
            Box::new(StopLoss::percent(config.stop_loss_percent)),
            Box::new(MaxBarsOpen::new(config.max_bars_open)),
        ];
        if let Some(pt) = config.profit_target_percent {
            exits.push(Box::new(ProfitTarget::new(pt)));
        }

        for rule in &config.sell_rules {
            let cond: Box<dyn SellCondition> = match rule {
                SellRule::StopValue { distance } => Box::new(StopLoss::value(*distance)),
                SellRule::NoMovement {
                    lookback,
                    threshold_percent,
                } => Box::new(NoMovement::new(*lookback, *threshold_percent)),
                SellRule::OscillatorZone {
                    indicator,
                    upper,
                    lower,
                } => {
                    let series = signals
                        .indicator(indicator)
                        .ok_or_else(|| SignalError::UnknownIndicator {
                            ticker: ticker.to_string(),
                            indicator: indicator.clone(),
                        })?;
                    Box::new(OscillatorZone::new(Arc::clone(series), *upper, *lower))
                }
                SellRule::TrailingChannel { lookback } => Box::new(TrailingChannel::new(*lookback)),
                SellRule::DirectionFlip { min_bars } => {
                    let bias = signals.bias().ok_or_else(|| SignalError::UnknownIndicator {
                        ticker: ticker.to_string(),
                        indicator: "bias".to_string(),
                    })?;
                    Box::new(DirectionFlip::new(Arc::clone(bias), *min_bars))
                }
            };
            exits.push(cond);
        }

        for strategy in signals.strategies() {
            if let Some(cp) = &strategy.counterpart {
                if signals.strategy(cp).is_none() {
                    return Err(SignalError::MissingSeries {
                        ticker: ticker.to_string(),
                        strategy: cp.clone(),
                    });
                }
            }
        }

        Ok(Self {
            entry,
            exits,
            size: config.order_size,
            commission: config.commission,
        })
    }

    /// Ticket for a combo. Adds one opposite-signal exit per member that has
    /// a counterpart.
    pub fn ticket(
        &self,
        name: String,
        direction: Direction,
        members: &[Arc<SubStrategy>],
        indicators: Vec<String>,
        signals: &SignalSet,
    ) -> OrderTicket {
        let mut sell_conditions = self.exits.clone();
        for member in members {
            let counterpart = member.counterpart.as_deref().and_then(|cp| signals.strategy(cp));
            if let Some(cp) = counterpart {
                sell_conditions.push(Box::new(OppositeSignal::new(&member.name, Arc::clone(cp))));
            }
        }

        OrderTicket {
            strategy: name,
            direction,
            size: self.size,
            commission: self.commission,
            dependent_indicators: indicators,
            buy_conditions: vec![self.entry.clone()],
            sell_conditions,
        }
    }
}
