//! ComboLab Core: order engine, combo search, statistics cache and control loop.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars, instruments, directions, order ids)
//! - Order lifecycle state machine with priority-ordered buy/sell conditions
//! - Combination generator over same-bar signals
//! - Bounded, multi-indexed statistics cache over order history
//! - Per-instrument combo engines and best-of-roots selection
//! - Bar-driven control loop with capital allocation and a monthly breaker

pub mod combos;
pub mod config;
pub mod context;
pub mod domain;
pub mod orders;
pub mod signals;
pub mod simulation;
pub mod stats;
pub mod strategy;

pub use config::{ConfigError, SimulationConfig};
pub use context::EngineContext;
pub use simulation::{InstrumentSetup, RunResult, SimulationError, Simulator};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything shared with worker threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Instrument>();
        require_sync::<domain::Instrument>();
        require_send::<domain::IdGen>();
        require_sync::<domain::IdGen>();

        // Orders
        require_send::<orders::Order>();
        require_sync::<orders::Order>();
        require_send::<orders::OrderTicket>();
        require_sync::<orders::OrderTicket>();
        require_send::<orders::OrderRecord>();
        require_sync::<orders::OrderRecord>();

        // Signals
        require_send::<signals::SignalSet>();
        require_sync::<signals::SignalSet>();

        // Shared state
        require_send::<stats::OrderHistory>();
        require_sync::<stats::OrderHistory>();
        require_send::<stats::OrderHandle>();
        require_sync::<stats::OrderHandle>();
        require_send::<EngineContext>();
        require_sync::<EngineContext>();

        // Engines move between worker threads but are never shared.
        require_send::<strategy::ComboStrategy>();
        require_send::<strategy::BestOfRoots>();
        require_send::<strategy::Suggestion>();

        require_send::<RunResult>();
        require_sync::<RunResult>();
    }

    /// Engines are driven through the trait object the control loop holds.
    #[test]
    fn engines_are_object_safe() {
        fn _check(engine: &mut dyn strategy::SuggestionEngine, bar: usize) -> Option<strategy::Suggestion> {
            engine.evaluate(bar)
        }
    }
}
