//! Simulation control loop, account and risk limits.

mod account;
mod breaker;
mod error;
mod result;
mod simulator;
mod sizing;

pub use account::{Account, ValuePoint};
pub use breaker::MonthlyBreaker;
pub use error::SimulationError;
pub use result::{BreakerEvent, ComboStatsSnapshot, RunResult};
pub use simulator::{InstrumentSetup, Simulator};
pub use sizing::{allocation_size, kelly_fraction};
