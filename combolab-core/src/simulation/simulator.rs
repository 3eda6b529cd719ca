//! Bar-driven control loop.
//!
//! The calendar is every distinct date across all instruments. Per date:
//!
//! 1. every instrument's engines are evaluated in parallel; the join is the
//!    bar barrier,
//! 2. suggestions with a positive win percent and a tradeable open become
//!    candidates, ranked by expected gain (else historical gain),
//! 3. account orders are maintained and cash reconciled,
//! 4. the monthly breaker observes the new account value,
//! 5. ranked candidates are turned into account orders within the
//!    concurrency and per-bar limits.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::context::EngineContext;
use crate::domain::{Direction, Instrument};
use crate::orders::Order;
use crate::signals::SignalSet;
use crate::strategy::{
    defer_indicator_readings, BestOfRoots, ComboStrategy, RankedCandidate, Suggestion, SuggestionEngine,
};

use super::account::Account;
use super::breaker::MonthlyBreaker;
use super::error::SimulationError;
use super::result::{BreakerEvent, ComboStatsSnapshot, RunResult};
use super::sizing::allocation_size;

/// One instrument and the signals its engines read.
#[derive(Debug)]
pub struct InstrumentSetup {
    pub instrument: Arc<Instrument>,
    pub signals: SignalSet,
    /// Strategy names per combo engine. Several groups are evaluated as
    /// independent roots and the best suggestion wins. Empty means a single
    /// engine over every strategy in `signals`. A strategy may belong to one
    /// group only, so each signal places one tracking order per combo.
    pub engine_groups: Vec<Vec<String>>,
}

struct InstrumentRunner {
    instrument: Arc<Instrument>,
    signals: Arc<SignalSet>,
    engine: Box<dyn SuggestionEngine>,
    bar: Option<usize>,
    suggestion: Option<Suggestion>,
}

impl InstrumentRunner {
    fn build(ctx: &EngineContext, setup: InstrumentSetup) -> Result<Self, SimulationError> {
        let InstrumentSetup {
            instrument,
            signals,
            engine_groups,
        } = setup;
        let signals = Arc::new(signals);
        let groups = if engine_groups.is_empty() {
            vec![signals.strategies().iter().map(|s| s.name.clone()).collect()]
        } else {
            engine_groups
        };

        let mut claimed: HashSet<&str> = HashSet::new();
        for name in groups.iter().flatten() {
            if !claimed.insert(name.as_str()) {
                return Err(SimulationError::OverlappingGroups {
                    ticker: instrument.ticker().to_string(),
                    strategy: name.clone(),
                });
            }
        }

        let mut engines: Vec<Box<dyn SuggestionEngine>> = Vec::with_capacity(groups.len());
        for group in &groups {
            if group.is_empty() {
                continue;
            }
            let engine = ComboStrategy::new(
                group.join("+"),
                ctx.clone(),
                Arc::clone(&instrument),
                Arc::clone(&signals),
                group,
            )?;
            engines.push(Box::new(engine));
        }

        let engine: Box<dyn SuggestionEngine> = match engines.len() {
            0 => {
                return Err(SimulationError::NoEngines {
                    ticker: instrument.ticker().to_string(),
                })
            }
            1 => engines.remove(0),
            _ => Box::new(BestOfRoots::new(instrument.ticker(), engines)),
        };

        Ok(Self {
            instrument,
            signals,
            engine,
            bar: None,
            suggestion: None,
        })
    }

    fn evaluate(&mut self, date: NaiveDate) {
        self.bar = self.instrument.bar_index(date);
        self.suggestion = match self.bar {
            Some(bar) => self.engine.evaluate(bar),
            None => None,
        };
    }

    /// The current suggestion, if it is tradeable.
    fn candidate(&self, config: &SimulationConfig) -> Option<&Suggestion> {
        let bar = self.bar?;
        let suggestion = self.suggestion.as_ref()?;
        if suggestion.highest_percent <= 0.0 {
            return None;
        }
        let min_price = match suggestion.direction {
            Direction::Long => config.min_order_price,
            Direction::Short => config.min_short_order_price,
        };
        (self.instrument.open(bar) >= min_price).then_some(suggestion)
    }
}

pub struct Simulator {
    ctx: EngineContext,
    runners: Vec<InstrumentRunner>,
    calendar: Vec<NaiveDate>,
    pool: rayon::ThreadPool,
}

impl Simulator {
    pub fn new(config: SimulationConfig, setups: Vec<InstrumentSetup>) -> Result<Self, SimulationError> {
        let ctx = EngineContext::new(config)?;
        Self::with_context(ctx, setups)
    }

    /// Build on an existing context, e.g. to share a history between runs.
    pub fn with_context(ctx: EngineContext, setups: Vec<InstrumentSetup>) -> Result<Self, SimulationError> {
        if setups.is_empty() {
            return Err(SimulationError::NoInstruments);
        }
        ctx.config.validate()?;

        let mut seen = HashSet::new();
        let mut dates = BTreeSet::new();
        let mut runners = Vec::with_capacity(setups.len());
        for setup in setups {
            let ticker = setup.instrument.ticker().to_string();
            if !seen.insert(ticker.clone()) {
                return Err(SimulationError::DuplicateTicker(ticker));
            }
            dates.extend(setup.instrument.bars().iter().map(|b| b.date));
            runners.push(InstrumentRunner::build(&ctx, setup)?);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(ctx.config.worker_threads)
            .build()
            .map_err(|e| SimulationError::ThreadPool(e.to_string()))?;

        Ok(Self {
            ctx,
            runners,
            calendar: dates.into_iter().collect(),
            pool,
        })
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn calendar(&self) -> &[NaiveDate] {
        &self.calendar
    }

    pub fn run(mut self) -> RunResult {
        let config = Arc::clone(&self.ctx.config);
        let mut account = Account::new(config.initial_cash);
        let mut breaker = MonthlyBreaker::new(config.max_monthly_loss);
        let mut candidates_log: Vec<RankedCandidate> = Vec::new();
        let mut combo_statistics: Vec<ComboStatsSnapshot> = Vec::new();
        let mut breaker_events: Vec<BreakerEvent> = Vec::new();

        info!(
            instruments = self.runners.len(),
            dates = self.calendar.len(),
            workers = self.pool.current_num_threads(),
            "simulation started"
        );

        let calendar = std::mem::take(&mut self.calendar);
        for (day, &date) in calendar.iter().enumerate() {
            // 1. Signals, in parallel. Returns once every instrument is done.
            let runners = &mut self.runners;
            self.pool
                .install(|| runners.par_iter_mut().for_each(|r| r.evaluate(date)));

            // 2. Candidates, stable-sorted best first.
            let mut ranked: Vec<(usize, &Suggestion)> = self
                .runners
                .iter()
                .enumerate()
                .filter_map(|(i, r)| r.candidate(&config).map(|s| (i, s)))
                .collect();
            ranked.sort_by(|a, b| b.1.ranking_gain().total_cmp(&a.1.ranking_gain()));
            candidates_log.extend(
                ranked
                    .iter()
                    .enumerate()
                    .map(|(rank, (_, s))| s.to_candidate(date, rank + 1)),
            );
            for r in &self.runners {
                if r.bar.is_some() && !r.engine.last_statistics().is_empty() {
                    combo_statistics.push(ComboStatsSnapshot {
                        date,
                        ticker: r.instrument.ticker().to_string(),
                        statistics: r.engine.last_statistics().to_vec(),
                    });
                }
            }

            // 3. Maintenance.
            let value = account.maintain(date);

            // 4. Breaker.
            if breaker.observe(date, value) {
                warn!(%date, value, baseline = breaker.baseline(), "monthly loss limit hit, entries blocked");
                breaker_events.push(BreakerEvent {
                    date,
                    baseline: breaker.baseline(),
                    value,
                });
            }

            // 5. Allocation.
            let remaining = calendar.len() - day - 1;
            let mut placed = 0;
            if day >= config.startup_delay_bars && !breaker.is_tripped() {
                for (rank, (idx, suggestion)) in ranked.iter().enumerate() {
                    if account.active().len() >= config.max_open_orders || placed >= config.max_orders_per_bar {
                        break;
                    }
                    if remaining < config.min_remaining_bars || account.cash() <= 1.1 * suggestion.size {
                        continue;
                    }
                    let size = allocation_size(suggestion.size, &suggestion.statistics, config.apply_kelly_sizing);
                    if size <= 0.0 {
                        continue;
                    }
                    let runner = &self.runners[*idx];
                    let Some(bar) = runner.bar else { continue };

                    let mut ticket = suggestion.ticket.clone();
                    ticket.size = size;
                    let mut order =
                        Order::open(self.ctx.ids.next_order_id(), Arc::clone(&runner.instrument), bar, ticket);
                    defer_selection(&mut order, suggestion, rank + 1);
                    defer_indicator_readings(&mut order, &runner.signals, &suggestion.indicators);
                    debug!(%date, ticker = order.ticker(), combo = order.strategy(), size, "account order");
                    account.submit(order);
                    placed += 1;
                }
            }

            debug!(
                %date,
                candidates = ranked.len(),
                placed,
                active = account.active().len(),
                cash = account.cash(),
                value,
                "bar done"
            );
        }

        let ticker_statistics = self
            .runners
            .iter()
            .map(|r| {
                self.ctx.history.ticker_statistics(
                    r.instrument.ticker(),
                    r.instrument.last_bar(),
                    config.max_lookback_bars,
                )
            })
            .collect();

        // Indicator buckets span instruments, so they are read over the whole run.
        let horizon = self.runners.iter().map(|r| r.instrument.last_bar()).max().unwrap_or(0);
        let indicator_statistics = self
            .ctx
            .history
            .indicators()
            .iter()
            .map(|name| self.ctx.history.indicator_statistics(name, horizon, usize::MAX))
            .collect();

        let final_cash = account.cash();
        let final_value = account.value();
        let (closed_orders, open_orders, value_series) = account.into_parts();
        info!(
            final_value,
            closed = closed_orders.len(),
            open = open_orders.len(),
            "simulation finished"
        );

        RunResult {
            initial_cash: config.initial_cash,
            final_cash,
            final_value,
            closed_orders,
            open_orders,
            candidates: candidates_log,
            value_series,
            combo_statistics,
            ticker_statistics,
            indicator_statistics,
            breaker_events,
            tracking_orders: self.ctx.history.order_count(),
        }
    }
}

/// Record why an account order was chosen.
fn defer_selection(order: &mut Order, suggestion: &Suggestion, rank: usize) {
    let win_percent = suggestion.highest_percent;
    let gain = suggestion.gain;
    let expected_gain = suggestion.expected_gain;
    order.defer_info("combo_win_percent", move |_| Value::from(win_percent));
    order.defer_info("combo_gain", move |_| Value::from(gain));
    order.defer_info("expected_gain", move |_| Value::from(expected_gain));
    order.defer_info("rank", move |_| Value::from(rank));
}
