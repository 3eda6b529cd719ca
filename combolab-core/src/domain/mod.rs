//! Domain types for ComboLab

pub mod bar;
pub mod direction;
pub mod ids;
pub mod instrument;

pub use bar::Bar;
pub use direction::Direction;
pub use ids::{IdGen, OrderId};
pub use instrument::{Instrument, InstrumentError};
