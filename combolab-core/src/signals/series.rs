//! Precomputed per-bar series consumed by the engine.
//!
//! Signal "found" flags, indicator readings and the higher-timeframe bias
//! are all computed upstream. The engine only reads them by bar index.

use serde::{Deserialize, Serialize};

use crate::domain::Direction;

/// A named sub-strategy evaluated on one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubStrategy {
    pub name: String,
    pub direction: Direction,
    /// Inverse-direction counterpart, used by opposite-signal exits.
    pub counterpart: Option<String>,
    /// Indicator names this strategy depends on, including those of
    /// strategies it requires.
    pub dependent_indicators: Vec<String>,
    /// Per-bar "entry pattern matched" flag.
    pub found: Vec<bool>,
}

impl SubStrategy {
    pub fn found_at(&self, bar: usize) -> bool {
        self.found.get(bar).copied().unwrap_or(false)
    }

    /// Most recent bar in `[bar - leeway, bar]` where the signal fired.
    pub fn last_found_within(&self, bar: usize, leeway: usize) -> Option<usize> {
        let earliest = bar.saturating_sub(leeway);
        (earliest..=bar).rev().find(|&b| self.found_at(b))
    }
}

/// A scalar indicator series (e.g. an oscillator). NaN marks missing values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSeries {
    pub name: String,
    pub values: Vec<f64>,
}

impl IndicatorSeries {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn value(&self, bar: usize) -> Option<f64> {
        self.values.get(bar).copied().filter(|v| !v.is_nan())
    }
}

/// Higher-timeframe directional bias, one reading per bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiasSeries {
    pub values: Vec<Option<Direction>>,
}

impl BiasSeries {
    pub fn new(values: Vec<Option<Direction>>) -> Self {
        Self { values }
    }

    pub fn at(&self, bar: usize) -> Option<Direction> {
        self.values.get(bar).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy(found: Vec<bool>) -> SubStrategy {
        SubStrategy {
            name: "cross_up".into(),
            direction: Direction::Long,
            counterpart: None,
            dependent_indicators: vec![],
            found,
        }
    }

    #[test]
    fn last_found_prefers_most_recent() {
        let s = strategy(vec![true, false, true, false, false]);
        assert_eq!(s.last_found_within(4, 2), Some(2));
        assert_eq!(s.last_found_within(4, 1), None);
        assert_eq!(s.last_found_within(3, 3), Some(2));
    }

    #[test]
    fn leeway_saturates_at_zero() {
        let s = strategy(vec![true, false]);
        assert_eq!(s.last_found_within(1, 10), Some(0));
    }

    #[test]
    fn found_past_end_is_false() {
        let s = strategy(vec![true]);
        assert!(!s.found_at(5));
    }

    #[test]
    fn indicator_nan_is_missing() {
        let ind = IndicatorSeries::new("rsi", vec![f64::NAN, 55.0]);
        assert_eq!(ind.value(0), None);
        assert_eq!(ind.value(1), Some(55.0));
        assert_eq!(ind.value(2), None);
    }
}
