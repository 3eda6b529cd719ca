//! Sub-strategy registry and per-instrument signal sets.
//!
//! Strategy definitions may require other strategies. Resolution walks the
//! requirement graph depth-first, fails on unknown names and on cycles, and
//! folds each strategy's dependent indicators together with those of its
//! requirements.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Direction;

use super::series::{BiasSeries, IndicatorSeries, SubStrategy};

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("unknown sub-strategy '{0}'")]
    UnknownStrategy(String),

    #[error("sub-strategy '{0}' is defined more than once")]
    DuplicateStrategy(String),

    #[error("cyclic dependency between sub-strategies: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    #[error("no signal series supplied for '{strategy}' on {ticker}")]
    MissingSeries { ticker: String, strategy: String },

    #[error("unknown indicator '{indicator}' on {ticker}")]
    UnknownIndicator { ticker: String, indicator: String },

    #[error("{ticker}: series '{name}' has {actual} values, expected {expected}")]
    LengthMismatch {
        ticker: String,
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("counterpart '{counterpart}' of '{strategy}' must have the opposite direction")]
    CounterpartDirection {
        strategy: String,
        counterpart: String,
    },
}

/// Static description of a named sub-strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDefinition {
    pub name: String,
    pub direction: Direction,
    #[serde(default)]
    pub counterpart: Option<String>,
    #[serde(default)]
    pub dependent_indicators: Vec<String>,
    /// Other sub-strategies this one is built from.
    #[serde(default)]
    pub requires: Vec<String>,
}

/// All known sub-strategy definitions, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    definitions: HashMap<String, StrategyDefinition>,
    order: Vec<String>,
}

impl StrategyRegistry {
    pub fn new(definitions: Vec<StrategyDefinition>) -> Result<Self, SignalError> {
        let mut registry = Self::default();
        for def in definitions {
            if registry.definitions.contains_key(&def.name) {
                return Err(SignalError::DuplicateStrategy(def.name));
            }
            registry.order.push(def.name.clone());
            registry.definitions.insert(def.name.clone(), def);
        }
        registry.validate_counterparts()?;
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&StrategyDefinition> {
        self.definitions.get(name)
    }

    /// Names in definition order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    fn validate_counterparts(&self) -> Result<(), SignalError> {
        for def in self.definitions.values() {
            if let Some(cp) = &def.counterpart {
                let other = self
                    .definitions
                    .get(cp)
                    .ok_or_else(|| SignalError::UnknownStrategy(cp.clone()))?;
                if other.direction == def.direction {
                    return Err(SignalError::CounterpartDirection {
                        strategy: def.name.clone(),
                        counterpart: cp.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve `roots` and everything they require, dependencies first.
    ///
    /// Each returned definition carries the union of its own dependent
    /// indicators and those of its (transitive) requirements.
    pub fn resolve(&self, roots: &[String]) -> Result<Vec<StrategyDefinition>, SignalError> {
        let mut resolved: Vec<StrategyDefinition> = Vec::new();
        let mut done: HashMap<String, usize> = HashMap::new();
        let mut path: Vec<String> = Vec::new();

        for root in roots {
            self.visit(root, &mut path, &mut done, &mut resolved)?;
        }
        Ok(resolved)
    }

    fn visit(
        &self,
        name: &str,
        path: &mut Vec<String>,
        done: &mut HashMap<String, usize>,
        resolved: &mut Vec<StrategyDefinition>,
    ) -> Result<usize, SignalError> {
        if let Some(&idx) = done.get(name) {
            return Ok(idx);
        }
        if let Some(pos) = path.iter().position(|p| p == name) {
            let mut cycle = path[pos..].to_vec();
            cycle.push(name.to_string());
            return Err(SignalError::CyclicDependency(cycle));
        }
        let def = self
            .definitions
            .get(name)
            .ok_or_else(|| SignalError::UnknownStrategy(name.to_string()))?;

        path.push(name.to_string());
        let mut indicators = def.dependent_indicators.clone();
        for req in &def.requires {
            let idx = self.visit(req, path, done, resolved)?;
            for ind in &resolved[idx].dependent_indicators {
                if !indicators.contains(ind) {
                    indicators.push(ind.clone());
                }
            }
        }
        path.pop();

        let mut out = def.clone();
        out.dependent_indicators = indicators;
        resolved.push(out);
        let idx = resolved.len() - 1;
        done.insert(name.to_string(), idx);
        Ok(idx)
    }
}

/// Everything the engine reads for one instrument besides prices.
#[derive(Debug, Clone, Default)]
pub struct SignalSet {
    strategies: Vec<Arc<SubStrategy>>,
    by_name: HashMap<String, usize>,
    indicators: HashMap<String, Arc<IndicatorSeries>>,
    bias: Option<Arc<BiasSeries>>,
}

impl SignalSet {
    /// Build the signal set for `ticker` from raw series.
    ///
    /// Every strategy named in `roots` (and everything it requires) must
    /// have a found series of exactly `bar_count` values.
    pub fn build(
        ticker: &str,
        bar_count: usize,
        registry: &StrategyRegistry,
        roots: &[String],
        mut found: HashMap<String, Vec<bool>>,
        indicators: Vec<IndicatorSeries>,
        bias: Option<BiasSeries>,
    ) -> Result<Self, SignalError> {
        let defs = registry.resolve(roots)?;

        let mut set = SignalSet::default();
        for def in defs {
            let series = found.remove(&def.name).ok_or_else(|| SignalError::MissingSeries {
                ticker: ticker.to_string(),
                strategy: def.name.clone(),
            })?;
            check_len(ticker, &def.name, bar_count, series.len())?;
            set.by_name.insert(def.name.clone(), set.strategies.len());
            set.strategies.push(Arc::new(SubStrategy {
                name: def.name,
                direction: def.direction,
                counterpart: def.counterpart,
                dependent_indicators: def.dependent_indicators,
                found: series,
            }));
        }

        for ind in indicators {
            check_len(ticker, &ind.name, bar_count, ind.values.len())?;
            set.indicators.insert(ind.name.clone(), Arc::new(ind));
        }

        if let Some(b) = bias {
            check_len(ticker, "bias", bar_count, b.values.len())?;
            set.bias = Some(Arc::new(b));
        }

        Ok(set)
    }

    pub fn strategies(&self) -> &[Arc<SubStrategy>] {
        &self.strategies
    }

    pub fn strategy(&self, name: &str) -> Option<&Arc<SubStrategy>> {
        self.by_name.get(name).map(|&i| &self.strategies[i])
    }

    pub fn indicator(&self, name: &str) -> Option<&Arc<IndicatorSeries>> {
        self.indicators.get(name)
    }

    pub fn bias(&self) -> Option<&Arc<BiasSeries>> {
        self.bias.as_ref()
    }

    /// Restrict to the named strategies (in the given order) while keeping
    /// every series, so counterparts outside the subset stay reachable.
    pub fn subset(&self, names: &[String]) -> Result<Vec<Arc<SubStrategy>>, SignalError> {
        names
            .iter()
            .map(|n| {
                self.strategy(n)
                    .cloned()
                    .ok_or_else(|| SignalError::UnknownStrategy(n.clone()))
            })
            .collect()
    }
}

fn check_len(ticker: &str, name: &str, expected: usize, actual: usize) -> Result<(), SignalError> {
    if expected != actual {
        return Err(SignalError::LengthMismatch {
            ticker: ticker.to_string(),
            name: name.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Names of all strategies referenced as counterparts by `roots`, so they can
/// be loaded alongside the roots.
pub fn with_counterparts(registry: &StrategyRegistry, roots: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for name in roots {
        if seen.insert(name.as_str()) {
            out.push(name.clone());
        }
    }
    for name in roots {
        if let Some(cp) = registry.get(name).and_then(|d| d.counterpart.as_deref()) {
            if seen.insert(cp) {
                out.push(cp.to_string());
            }
        }
    }
    out
}
