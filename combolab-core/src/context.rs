//! Shared run context.
//!
//! One [`EngineContext`] is built per simulation and cloned into every
//! engine. Nothing in the crate is global, so several simulations may run
//! side by side in one process.

use std::sync::Arc;

use crate::config::{ConfigError, SimulationConfig};
use crate::domain::IdGen;
use crate::stats::OrderHistory;

#[derive(Debug, Clone)]
pub struct EngineContext {
    pub config: Arc<SimulationConfig>,
    pub history: Arc<OrderHistory>,
    pub ids: Arc<IdGen>,
}

impl EngineContext {
    /// Validate `config` and build a fresh bounded history and id counter.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let history = OrderHistory::bounded(config.history_limits());
        Ok(Self {
            config: Arc::new(config),
            history: Arc::new(history),
            ids: Arc::new(IdGen::new()),
        })
    }
}
