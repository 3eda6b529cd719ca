//! Signal inputs: sub-strategy found flags, indicator readings and bias.

pub mod registry;
pub mod series;

pub use registry::{with_counterparts, SignalError, SignalSet, StrategyDefinition, StrategyRegistry};
pub use series::{BiasSeries, IndicatorSeries, SubStrategy};
