use thiserror::Error;

use crate::config::ConfigError;
use crate::signals::SignalError;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error("no instruments to simulate")]
    NoInstruments,

    #[error("ticker '{0}' supplied more than once")]
    DuplicateTicker(String),

    #[error("instrument {ticker}: strategy '{strategy}' appears in more than one engine group")]
    OverlappingGroups { ticker: String, strategy: String },

    #[error("instrument {ticker} has no engines")]
    NoEngines { ticker: String },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}
