//! Synthetic instruments for demos and tests.
//!
//! Prices are a seeded random walk over weekdays. Signals and indicators are
//! then derived from those prices with simple, deterministic rules, so the
//! same seed always produces the same run.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use combolab_core::domain::{Bar, Direction, Instrument};
use combolab_core::signals::{
    BiasSeries, IndicatorSeries, SignalError, SignalSet, StrategyDefinition, StrategyRegistry,
};
use combolab_core::InstrumentSetup;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CHANNEL: usize = 20;
const SMA: usize = 10;
const MOMENTUM: usize = 10;
const BIAS_SMA: usize = 50;
const THRUST_PERCENT: f64 = 3.0;

/// Parameters for a synthetic universe.
#[derive(Debug, Clone)]
pub struct SyntheticOptions {
    pub tickers: usize,
    pub bars: usize,
    pub seed: u64,
    pub start: NaiveDate,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            tickers: 4,
            bars: 500,
            seed: 42,
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
        }
    }
}

/// The sub-strategy catalog every synthetic instrument carries.
pub fn strategy_definitions() -> Vec<StrategyDefinition> {
    fn def(name: &str, direction: Direction, counterpart: &str, indicators: &[&str], requires: &[&str]) -> StrategyDefinition {
        StrategyDefinition {
            name: name.into(),
            direction,
            counterpart: Some(counterpart.into()),
            dependent_indicators: indicators.iter().map(|s| s.to_string()).collect(),
            requires: requires.iter().map(|s| s.to_string()).collect(),
        }
    }
    vec![
        def("channel_breakout", Direction::Long, "channel_breakdown", &[], &[]),
        def("channel_breakdown", Direction::Short, "channel_breakout", &[], &[]),
        def("sma_cross_up", Direction::Long, "sma_cross_down", &["sma_10"], &[]),
        def("sma_cross_down", Direction::Short, "sma_cross_up", &["sma_10"], &[]),
        def("momentum_thrust", Direction::Long, "momentum_slump", &["momentum_10"], &["sma_cross_up"]),
        def("momentum_slump", Direction::Short, "momentum_thrust", &["momentum_10"], &["sma_cross_down"]),
    ]
}

/// Ticker names used for a universe of `n` instruments.
pub fn tickers(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("SYN{i:02}")).collect()
}

/// Build every synthetic instrument with its signal set.
pub fn generate(opts: &SyntheticOptions) -> Result<Vec<InstrumentSetup>, SignalError> {
    let registry = StrategyRegistry::new(strategy_definitions())?;
    tickers(opts.tickers)
        .iter()
        .filter_map(|ticker| {
            let bars = random_walk(ticker, opts.seed, opts.start, opts.bars);
            // A zero-length walk has no instrument.
            let instrument = Instrument::new(ticker.as_str(), 0.01, bars).ok()?;
            Some(build_setup(&registry, instrument))
        })
        .collect()
}

fn build_setup(registry: &StrategyRegistry, instrument: Instrument) -> Result<InstrumentSetup, SignalError> {
    let closes: Vec<f64> = instrument.bars().iter().map(|b| b.close).collect();
    let highs: Vec<f64> = instrument.bars().iter().map(|b| b.high).collect();
    let lows: Vec<f64> = instrument.bars().iter().map(|b| b.low).collect();
    let n = closes.len();

    let sma = sma(&closes, SMA);
    let momentum = momentum(&closes, MOMENTUM);
    let slow = sma_values(&closes, BIAS_SMA);

    let mut found: HashMap<String, Vec<bool>> = HashMap::new();
    found.insert(
        "channel_breakout".into(),
        (0..n)
            .map(|i| i >= CHANNEL && closes[i] > highs[i - CHANNEL..i].iter().copied().fold(f64::MIN, f64::max))
            .collect(),
    );
    found.insert(
        "channel_breakdown".into(),
        (0..n)
            .map(|i| i >= CHANNEL && closes[i] < lows[i - CHANNEL..i].iter().copied().fold(f64::MAX, f64::min))
            .collect(),
    );
    found.insert(
        "sma_cross_up".into(),
        (0..n)
            .map(|i| i >= 1 && closes[i - 1] <= sma[i - 1] && closes[i] > sma[i])
            .collect(),
    );
    found.insert(
        "sma_cross_down".into(),
        (0..n)
            .map(|i| i >= 1 && closes[i - 1] >= sma[i - 1] && closes[i] < sma[i])
            .collect(),
    );
    found.insert(
        "momentum_thrust".into(),
        momentum.iter().map(|&m| m > THRUST_PERCENT).collect(),
    );
    found.insert(
        "momentum_slump".into(),
        momentum.iter().map(|&m| m < -THRUST_PERCENT).collect(),
    );

    let bias = BiasSeries::new(
        closes
            .iter()
            .zip(&slow)
            .map(|(&c, &s)| s.map(|s| if c >= s { Direction::Long } else { Direction::Short }))
            .collect(),
    );

    let indicators = vec![
        IndicatorSeries::new("sma_10", sma),
        IndicatorSeries::new("momentum_10", momentum),
    ];
    let ticker = instrument.ticker().to_string();
    let signals = SignalSet::build(&ticker, n, registry, registry.names(), found, indicators, Some(bias))?;
    Ok(InstrumentSetup {
        instrument: Arc::new(instrument),
        signals,
        engine_groups: vec![],
    })
}

/// Weekday random walk from 100.0, seeded from `seed` and the ticker.
pub fn random_walk(ticker: &str, seed: u64, start: NaiveDate, bars: usize) -> Vec<Bar> {
    let key = blake3::hash(format!("{seed}:{ticker}").as_bytes());
    let mut rng = StdRng::from_seed(*key.as_bytes());

    let mut out = Vec::with_capacity(bars);
    let mut price = 100.0_f64;
    let mut current = start;
    while out.len() < bars {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.025..0.026);
        let open = price * (1.0 + rng.gen_range(-0.005..0.005));
        let close = (price * (1.0 + daily_return)).max(1.0);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        out.push(Bar {
            date: current,
            open,
            high,
            low,
            close,
            volume: rng.gen_range(500_000..5_000_000u64),
        });

        price = close;
        current += chrono::Duration::days(1);
    }
    out
}

/// Simple moving average; NaN until the window fills.
fn sma(values: &[f64], period: usize) -> Vec<f64> {
    sma_values(values, period)
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect()
}

fn sma_values(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        out.push((i + 1 >= period).then(|| sum / period as f64));
    }
    out
}

/// Percent change over `period` bars; NaN until enough history.
fn momentum(values: &[f64], period: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i >= period && values[i - period] > 0.0 {
                (values[i] / values[i - period] - 1.0) * 100.0
            } else {
                f64::NAN
            }
        })
        .collect()
}
