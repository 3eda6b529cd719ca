//! ComboLab Runner: run files, data loading, orchestration and export.
//!
//! This crate builds on `combolab-core` to provide:
//! - TOML run files with content-addressed run ids
//! - CSV loaders for prices, signals, indicators and bias
//! - Seeded synthetic universes for demos
//! - Run orchestration into a serializable report
//! - JSON and CSV artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod synthetic;

pub use config::{InstrumentFile, RunFile, RunFileError, RunId};
pub use data_loader::{load_bars, load_bias, load_indicators, load_instrument, load_signals, warn_malformed, LoadError};
pub use export::{export_candidates_csv, export_equity_csv, export_json, export_orders_csv, import_json, save_artifacts};
pub use runner::{run_demo, run_file, run_setups, RunError, RunReport, SCHEMA_VERSION};
pub use synthetic::SyntheticOptions;
