//! Run orchestration: run file or synthetic universe in, report out.
//!
//! Two entry points:
//! - `run_file()`: loads every instrument listed in a run file, then runs.
//! - `run_demo()`: generates a synthetic universe, then runs.

use std::collections::HashMap;
use std::sync::Arc;

use combolab_core::domain::Instrument;
use combolab_core::signals::{with_counterparts, SignalError, SignalSet, StrategyRegistry};
use combolab_core::{InstrumentSetup, RunResult, SimulationConfig, SimulationError, Simulator};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{InstrumentFile, RunFile, RunFileError};
use crate::data_loader::{load_bars, load_bias, load_indicators, load_signals, warn_malformed, LoadError};
use crate::synthetic::{self, SyntheticOptions};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("run file error: {0}")]
    RunFile(#[from] RunFileError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("signal error: {0}")]
    Signal(#[from] SignalError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
    #[error("failed to hash run file: {0}")]
    RunId(#[from] serde_json::Error),
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// A finished run together with what produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub synthetic: bool,
    pub tickers: Vec<String>,
    pub config: SimulationConfig,
    pub result: RunResult,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Load and run everything a run file describes.
///
/// Instruments without any price rows are skipped with a warning. Any other
/// load or resolution failure aborts the run.
pub fn run_file(run: &RunFile) -> Result<RunReport, RunError> {
    let registry = StrategyRegistry::new(run.strategies.clone())?;
    let mut setups = Vec::with_capacity(run.instruments.len());
    for inst in &run.instruments {
        if let Some(setup) = load_setup(run, &registry, inst)? {
            setups.push(setup);
        }
    }

    let run_id = run.run_id()?;
    run_setups(run_id, false, run.simulation.clone(), setups)
}

/// Generate a synthetic universe and run it.
pub fn run_demo(config: SimulationConfig, opts: &SyntheticOptions) -> Result<RunReport, RunError> {
    let setups = synthetic::generate(opts)?;
    let key = format!("demo:{}:{}:{}:{}", opts.tickers, opts.bars, opts.seed, serde_json::to_string(&config)?);
    let run_id = blake3::hash(key.as_bytes()).to_hex().to_string();
    run_setups(run_id, true, config, setups)
}

/// Run pre-built instruments.
pub fn run_setups(
    run_id: String,
    synthetic: bool,
    config: SimulationConfig,
    setups: Vec<InstrumentSetup>,
) -> Result<RunReport, RunError> {
    let tickers: Vec<String> = setups.iter().map(|s| s.instrument.ticker().to_string()).collect();
    info!(run_id = %run_id, instruments = tickers.len(), synthetic, "starting run");

    let simulator = Simulator::new(config.clone(), setups)?;
    let result = simulator.run();

    info!(
        run_id = %run_id,
        final_value = result.final_value,
        total_return = result.total_return(),
        closed = result.closed_orders.len(),
        "run complete"
    );

    Ok(RunReport {
        schema_version: SCHEMA_VERSION,
        run_id,
        synthetic,
        tickers,
        config,
        result,
    })
}

fn load_setup(
    run: &RunFile,
    registry: &StrategyRegistry,
    inst: &InstrumentFile,
) -> Result<Option<InstrumentSetup>, RunError> {
    let bars = load_bars(&run.resolve(&inst.prices))?;
    if bars.is_empty() {
        warn!(ticker = %inst.ticker, "no price data, instrument skipped");
        return Ok(None);
    }
    warn_malformed(&inst.ticker, &bars);
    let instrument = Instrument::new(inst.ticker.as_str(), inst.tick_size, bars).map_err(LoadError::from)?;
    let dates: Vec<_> = instrument.bars().iter().map(|b| b.date).collect();

    let roots: Vec<String> = if inst.strategies.is_empty() {
        registry.names().to_vec()
    } else {
        inst.strategies.clone()
    };
    // Engine group members must be loaded too.
    let mut wanted = roots.clone();
    wanted.extend(inst.engine_groups.iter().flatten().cloned());
    let wanted = with_counterparts(registry, &wanted);

    let found: HashMap<String, Vec<bool>> = load_signals(&run.resolve(&inst.signals), &dates)?;
    let indicators = match &inst.indicators {
        Some(path) => load_indicators(&run.resolve(path), &dates)?,
        None => Vec::new(),
    };
    let bias = match &inst.bias {
        Some(path) => Some(load_bias(&run.resolve(path), &dates)?),
        None => None,
    };

    let signals = SignalSet::build(&inst.ticker, dates.len(), registry, &wanted, found, indicators, bias)?;

    // Strategies loaded only as counterparts or requirements never join a
    // combo unless listed.
    let engine_groups = if !inst.engine_groups.is_empty() {
        inst.engine_groups.clone()
    } else if !inst.strategies.is_empty() {
        vec![roots]
    } else {
        Vec::new()
    };

    Ok(Some(InstrumentSetup {
        instrument: Arc::new(instrument),
        signals,
        engine_groups,
    }))
}
