//! ComboLab CLI: run and demo commands.
//!
//! Commands:
//! - `run`: execute a simulation from a TOML run file
//! - `demo`: execute a simulation over a seeded synthetic universe

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use combolab_core::SimulationConfig;
use combolab_runner::{run_demo, run_file, save_artifacts, RunFile, RunReport, SyntheticOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "combolab",
    about = "ComboLab CLI: signal-combination backtesting engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a simulation from a TOML run file.
    Run {
        /// Path to the run file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Execute a simulation over synthetic instruments.
    Demo {
        /// Number of synthetic instruments.
        #[arg(long, default_value_t = 4)]
        tickers: usize,

        /// Bars per instrument.
        #[arg(long, default_value_t = 500)]
        bars: usize,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// First date (YYYY-MM-DD).
        #[arg(long, default_value = "2020-01-01")]
        start: String,

        /// Optional TOML file with a `[simulation]` table.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for artifacts. Nothing is written when omitted.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

/// Only the `[simulation]` table of a TOML file.
#[derive(serde::Deserialize, Default)]
struct SimulationOnly {
    #[serde(default)]
    simulation: SimulationConfig,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config, output_dir } => run_cmd(&config, &output_dir),
        Commands::Demo {
            tickers,
            bars,
            seed,
            start,
            config,
            output_dir,
        } => demo_cmd(tickers, bars, seed, &start, config.as_deref(), output_dir.as_deref()),
    }
}

fn run_cmd(config: &Path, output_dir: &Path) -> Result<()> {
    let run = RunFile::load(config).with_context(|| format!("loading run file {}", config.display()))?;
    let report = run_file(&run)?;
    print_summary(&report);

    let run_dir = save_artifacts(&report, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn demo_cmd(
    tickers: usize,
    bars: usize,
    seed: u64,
    start: &str,
    config: Option<&Path>,
    output_dir: Option<&Path>,
) -> Result<()> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid start date '{start}' (expected YYYY-MM-DD)"))?;
    let simulation = match config {
        Some(path) => {
            let text =
                std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
            let parsed: SimulationOnly =
                toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))?;
            parsed.simulation
        }
        None => SimulationConfig::default(),
    };

    let opts = SyntheticOptions {
        tickers,
        bars,
        seed,
        start,
    };
    let report = run_demo(simulation, &opts)?;
    print_summary(&report);

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&report, dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    let r = &report.result;
    let (first, last) = match (r.value_series.first(), r.value_series.last()) {
        (Some(f), Some(l)) => (f.date.to_string(), l.date.to_string()),
        _ => (String::from("-"), String::from("-")),
    };
    let wins = r.closed_orders.iter().filter(|o| o.gain > 0.0).count();
    let win_rate = if r.closed_orders.is_empty() {
        0.0
    } else {
        wins as f64 / r.closed_orders.len() as f64 * 100.0
    };

    println!();
    println!("=== ComboLab Run ===");
    println!("Run id:          {}", report.run_id);
    if report.synthetic {
        println!("Data:            synthetic");
    }
    println!("Instruments:     {}", report.tickers.join(", "));
    println!("Period:          {first} to {last} ({} dates)", r.value_series.len());
    println!("Tracking orders: {}", r.tracking_orders);
    println!("Candidates:      {}", r.candidates.len());
    println!();
    println!("--- Account ---");
    println!("Initial cash:    {:.2}", r.initial_cash);
    println!("Final value:     {:.2}", r.final_value);
    println!("Total return:    {:.2}%", r.total_return() * 100.0);
    println!("Closed orders:   {}", r.closed_orders.len());
    println!("Win rate:        {win_rate:.1}%");
    println!("Realized gain:   {:.2}", r.total_gain());
    println!("Still open:      {}", r.open_orders.len());
    if !r.breaker_events.is_empty() {
        println!("Breaker trips:   {}", r.breaker_events.len());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_command() {
        let cli = Cli::try_parse_from(["combolab", "run", "--config", "run.toml"]).unwrap();
        match cli.command {
            Commands::Run { config, output_dir } => {
                assert_eq!(config, PathBuf::from("run.toml"));
                assert_eq!(output_dir, PathBuf::from("results"));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parses_demo_defaults() {
        let cli = Cli::try_parse_from(["combolab", "demo", "--seed", "7"]).unwrap();
        match cli.command {
            Commands::Demo {
                tickers, bars, seed, output_dir, ..
            } => {
                assert_eq!((tickers, bars, seed), (4, 500, 7));
                assert!(output_dir.is_none());
            }
            _ => panic!("expected demo"),
        }
    }

    #[test]
    fn simulation_table_is_optional() {
        let parsed: SimulationOnly = toml::from_str("").unwrap();
        assert_eq!(parsed.simulation, SimulationConfig::default());
        let parsed: SimulationOnly = toml::from_str("[simulation]\nmax_combo_size = 2\n").unwrap();
        assert_eq!(parsed.simulation.max_combo_size, 2);
    }
}
