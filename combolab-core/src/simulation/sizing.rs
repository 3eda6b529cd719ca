//! Kelly-style position sizing.

use crate::stats::StrategyStatistics;

/// Kelly fraction `W - (1 - W) / R`, where `W` is the win rate and `R` the
/// ratio of average win to average loss. `None` without a usable sample.
pub fn kelly_fraction(stats: &StrategyStatistics) -> Option<f64> {
    if stats.is_empty() || stats.average_win <= 0.0 {
        return None;
    }
    let w = stats.win_percent / 100.0;
    if stats.average_loss >= 0.0 {
        // No losing trades on record.
        return Some(w.min(1.0));
    }
    let r = stats.average_win / stats.average_loss.abs();
    Some(w - (1.0 - w) / r)
}

/// Dollar size for an account order.
///
/// Without `apply_kelly` the requested size passes through unchanged.
/// Otherwise it is scaled by the Kelly fraction clamped to `[0, 1]`.
pub fn allocation_size(requested: f64, stats: &StrategyStatistics, apply_kelly: bool) -> f64 {
    if !apply_kelly {
        return requested;
    }
    match kelly_fraction(stats) {
        Some(f) => requested * f.clamp(0.0, 1.0),
        None => 0.0,
    }
}
