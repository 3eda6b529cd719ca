//! Combo strategy engines.
//!
//! A [`SuggestionEngine`] is evaluated once per bar for one instrument. It
//! drives its own tracking orders, places new ones for the signal combos
//! that fired, and proposes the combo with the best rolling win rate.

mod best_of;
mod combo;
mod rules;
mod suggestion;

pub use best_of::BestOfRoots;
pub use combo::ComboStrategy;
pub(crate) use combo::defer_indicator_readings;
pub use rules::RuleBook;
pub use suggestion::{RankedCandidate, Suggestion};

use crate::stats::StrategyStatistics;

pub trait SuggestionEngine: Send {
    fn label(&self) -> &str;

    /// Evaluate `bar`. Returns the best combo found, if any fired.
    fn evaluate(&mut self, bar: usize) -> Option<Suggestion>;

    /// Combo statistics gathered by the last `evaluate`.
    fn last_statistics(&self) -> &[StrategyStatistics];

    /// Tracking orders not yet finished.
    fn active_orders(&self) -> usize;
}
