//! Concrete buy and sell conditions.
//!
//! Entry: market fill, limit fill.
//! Exit: stop-loss (percent or absolute), profit target, max bars open,
//! opposite signal, oscillator zone reversal, no-movement stop, trailing
//! channel stop, direction flip.

mod direction_flip;
mod entry;
mod max_bars_open;
mod no_movement;
mod opposite_signal;
mod oscillator_zone;
mod profit_target;
mod stop_loss;
mod trailing_channel;

pub use direction_flip::DirectionFlip;
pub use entry::{LimitBuy, MarketBuy};
pub use max_bars_open::MaxBarsOpen;
pub use no_movement::NoMovement;
pub use opposite_signal::OppositeSignal;
pub use oscillator_zone::OscillatorZone;
pub use profit_target::ProfitTarget;
pub use stop_loss::StopLoss;
pub use trailing_channel::TrailingChannel;

use super::order::Order;

/// Close at this bar's close. Returns true if the order was closed.
fn sell_at_close(order: &mut Order, bar: usize, reason: &str) -> bool {
    let close = order.instrument().close(bar);
    order.sell(close, bar, reason).is_ok()
}

/// Bars since the order was filled, or None if it is not filled.
fn bars_held(order: &Order, bar: usize) -> Option<usize> {
    order.buy_bar().map(|b| bar.saturating_sub(b))
}
