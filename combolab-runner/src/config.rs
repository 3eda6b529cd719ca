//! Serializable run files.
//!
//! A run file is TOML with three sections:
//!
//! ```toml
//! [simulation]
//! max_combo_size = 3
//!
//! [[instruments]]
//! ticker = "SPY"
//! prices = "data/SPY.csv"
//! signals = "data/SPY_signals.csv"
//!
//! [[strategies]]
//! name = "breakout"
//! direction = "Long"
//! ```
//!
//! Relative data paths resolve against the directory holding the run file.

use std::path::{Path, PathBuf};

use combolab_core::signals::StrategyDefinition;
use combolab_core::SimulationConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum RunFileError {
    #[error("failed to read run file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse run file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("run file lists no instruments")]
    NoInstruments,

    #[error("run file defines no strategies")]
    NoStrategies,

    #[error("invalid tick size {tick_size} for {ticker}")]
    TickSize { ticker: String, tick_size: f64 },
}

/// One instrument and the files its series are read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentFile {
    pub ticker: String,
    /// CSV with `date,open,high,low,close,volume`.
    pub prices: PathBuf,
    /// CSV with a `date` column and one found-flag column per strategy.
    pub signals: PathBuf,
    /// CSV with a `date` column and one column per indicator.
    #[serde(default)]
    pub indicators: Option<PathBuf>,
    /// CSV with `date,bias`, bias being `long`, `short` or empty.
    #[serde(default)]
    pub bias: Option<PathBuf>,
    #[serde(default = "default_tick_size")]
    pub tick_size: f64,
    /// Root strategies traded on this instrument. Empty means every
    /// strategy in the run file.
    #[serde(default)]
    pub strategies: Vec<String>,
    /// Independent combo engines; see `InstrumentSetup::engine_groups`.
    #[serde(default)]
    pub engine_groups: Vec<Vec<String>>,
}

fn default_tick_size() -> f64 {
    0.01
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFile {
    #[serde(default)]
    pub simulation: SimulationConfig,
    pub instruments: Vec<InstrumentFile>,
    pub strategies: Vec<StrategyDefinition>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl RunFile {
    /// Read and parse a run file from disk.
    pub fn load(path: &Path) -> Result<Self, RunFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| RunFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut run = Self::from_toml_str(&text)?;
        run.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(run)
    }

    /// Parse a run file. Relative paths resolve against the working directory.
    pub fn from_toml_str(text: &str) -> Result<Self, RunFileError> {
        let run: RunFile = toml::from_str(text)?;
        run.check()?;
        Ok(run)
    }

    fn check(&self) -> Result<(), RunFileError> {
        if self.instruments.is_empty() {
            return Err(RunFileError::NoInstruments);
        }
        if self.strategies.is_empty() {
            return Err(RunFileError::NoStrategies);
        }
        for inst in &self.instruments {
            if !(inst.tick_size > 0.0) {
                return Err(RunFileError::TickSize {
                    ticker: inst.ticker.clone(),
                    tick_size: inst.tick_size,
                });
            }
        }
        Ok(())
    }

    /// Resolve a data path from the run file.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Deterministic hash of the parsed run file.
    ///
    /// Two run files that parse to the same content share a run id,
    /// regardless of formatting or comments.
    pub fn run_id(&self) -> Result<RunId, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
