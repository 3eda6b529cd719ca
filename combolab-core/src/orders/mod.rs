//! Order lifecycle state machine and the buy/sell condition catalog.

pub mod condition;
pub mod conditions;
pub mod extra_info;
pub mod order;

pub use condition::{priority, BuyCondition, SellCondition};
pub use extra_info::ExtraInfo;
pub use order::{Order, OrderError, OrderRecord, OrderStatus, OrderTicket, END_OF_DATA, FORCED_CLOSE};
