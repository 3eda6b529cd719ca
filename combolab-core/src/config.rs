//! Simulation configuration.
//!
//! Every knob the engines and the control loop read lives here. Percentages
//! are whole percents (5.0 means 5%). Missing fields in a serialized config
//! take the values from [`SimulationConfig::default`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::HistoryLimits;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must be at least 1")]
    Zero { field: &'static str },

    #[error("min_combo_size ({min}) exceeds max_combo_size ({max})")]
    ComboSizeRange { min: usize, max: usize },

    #[error("oscillator zone bounds inverted: lower {lower} >= upper {upper}")]
    InvertedZone { lower: f64, upper: f64 },
}

/// How combo orders enter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryRule {
    /// Fill at the next bar's open.
    #[default]
    Market,
    /// Rest a limit `offset_percent` away from the signal bar's close.
    Limit { offset_percent: f64, expire_bars: usize },
}

/// Extra exit rules attached to every combo order, on top of the hard stop,
/// the optional profit target, max bars open and the opposite-signal exits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SellRule {
    StopValue { distance: f64 },
    NoMovement { lookback: usize, threshold_percent: f64 },
    OscillatorZone { indicator: String, upper: f64, lower: f64 },
    TrailingChannel { lookback: usize },
    DirectionFlip { min_bars: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // ── Combo search ──
    pub min_combo_size: usize,
    pub max_combo_size: usize,
    /// A signal counts as fired if it fired within this many prior bars.
    pub combo_leeway_bars: usize,
    /// Only combine signals agreeing with the higher-timeframe bias.
    pub use_bias_filter: bool,
    /// Keep only the best combo's statistics per bar.
    pub abbreviated_reporting: bool,

    // ── Order rules ──
    /// Requested dollar size per order.
    pub order_size: f64,
    /// Commission per side.
    pub commission: f64,
    pub entry: EntryRule,
    pub stop_loss_percent: f64,
    pub profit_target_percent: Option<f64>,
    pub max_bars_open: usize,
    pub sell_rules: Vec<SellRule>,

    // ── Statistics ──
    pub max_lookback_bars: usize,
    pub max_lookback_orders: usize,
    pub min_required_orders: usize,

    // ── Account and allocation ──
    pub initial_cash: f64,
    pub max_open_orders: usize,
    pub max_orders_per_bar: usize,
    pub min_order_price: f64,
    pub min_short_order_price: f64,
    pub max_monthly_loss: f64,
    pub startup_delay_bars: usize,
    /// New entries need at least this many calendar dates left.
    pub min_remaining_bars: usize,
    pub apply_kelly_sizing: bool,

    // ── Runtime ──
    /// Worker threads for per-instrument evaluation. 0 uses rayon's default.
    pub worker_threads: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            min_combo_size: 1,
            max_combo_size: 3,
            combo_leeway_bars: 0,
            use_bias_filter: false,
            abbreviated_reporting: true,
            order_size: 10_000.0,
            commission: 1.0,
            entry: EntryRule::Market,
            stop_loss_percent: 5.0,
            profit_target_percent: None,
            max_bars_open: 20,
            sell_rules: Vec::new(),
            max_lookback_bars: 250,
            max_lookback_orders: 100,
            min_required_orders: 3,
            initial_cash: 100_000.0,
            max_open_orders: 10,
            max_orders_per_bar: 2,
            min_order_price: 5.0,
            min_short_order_price: 10.0,
            max_monthly_loss: 10_000.0,
            startup_delay_bars: 0,
            min_remaining_bars: 1,
            apply_kelly_sizing: false,
            worker_threads: 0,
        }
    }
}

impl SimulationConfig {
    pub fn history_limits(&self) -> HistoryLimits {
        HistoryLimits {
            max_lookback_bars: self.max_lookback_bars,
            max_lookback_orders: self.max_lookback_orders,
            min_required_orders: self.min_required_orders,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_combo_size == 0 {
            return Err(ConfigError::Zero { field: "min_combo_size" });
        }
        if self.min_combo_size > self.max_combo_size {
            return Err(ConfigError::ComboSizeRange {
                min: self.min_combo_size,
                max: self.max_combo_size,
            });
        }
        if self.max_lookback_orders == 0 {
            return Err(ConfigError::Zero { field: "max_lookback_orders" });
        }
        if self.max_bars_open == 0 {
            return Err(ConfigError::Zero { field: "max_bars_open" });
        }

        positive("order_size", self.order_size)?;
        positive("stop_loss_percent", self.stop_loss_percent)?;
        non_negative("initial_cash", self.initial_cash)?;
        non_negative("commission", self.commission)?;
        non_negative("min_order_price", self.min_order_price)?;
        non_negative("min_short_order_price", self.min_short_order_price)?;
        non_negative("max_monthly_loss", self.max_monthly_loss)?;
        if let Some(pt) = self.profit_target_percent {
            positive("profit_target_percent", pt)?;
        }
        if let EntryRule::Limit { offset_percent, .. } = self.entry {
            non_negative("entry.offset_percent", offset_percent)?;
        }

        for rule in &self.sell_rules {
            match *rule {
                SellRule::StopValue { distance } => positive("sell_rules.distance", distance)?,
                SellRule::NoMovement { lookback, threshold_percent } => {
                    if lookback == 0 {
                        return Err(ConfigError::Zero { field: "sell_rules.lookback" });
                    }
                    positive("sell_rules.threshold_percent", threshold_percent)?;
                }
                SellRule::OscillatorZone { upper, lower, .. } => {
                    if lower >= upper {
                        return Err(ConfigError::InvertedZone { lower, upper });
                    }
                }
                SellRule::TrailingChannel { lookback } => {
                    if lookback == 0 {
                        return Err(ConfigError::Zero { field: "sell_rules.lookback" });
                    }
                }
                SellRule::DirectionFlip { .. } => {}
            }
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(SimulationConfig::default().validate(), Ok(()));
    }

    #[test]
    fn combo_range_checked() {
        let cfg = SimulationConfig {
            min_combo_size: 4,
            max_combo_size: 2,
            ..SimulationConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ComboSizeRange { min: 4, max: 2 }));
    }

    #[test]
    fn rejects_bad_sell_rule() {
        let cfg = SimulationConfig {
            sell_rules: vec![SellRule::OscillatorZone {
                indicator: "rsi".into(),
                upper: 30.0,
                lower: 70.0,
            }],
            ..SimulationConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvertedZone { .. })));
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: SimulationConfig = toml::from_str(
            r#"
            min_combo_size = 2
            stop_loss_percent = 3.0

            [entry]
            type = "LIMIT"
            offset_percent = 1.0
            expire_bars = 3

            [[sell_rules]]
            type = "TRAILING_CHANNEL"
            lookback = 10

            [[sell_rules]]
            type = "DIRECTION_FLIP"
            min_bars = 2
            "#,
        )
        .unwrap();
        assert_eq!(cfg.min_combo_size, 2);
        assert_eq!(cfg.max_combo_size, 3);
        assert_eq!(cfg.entry, EntryRule::Limit { offset_percent: 1.0, expire_bars: 3 });
        assert_eq!(cfg.sell_rules.len(), 2);
        assert!(!cfg.apply_kelly_sizing);
        cfg.validate().unwrap();
    }
}
