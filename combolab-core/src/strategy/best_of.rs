use crate::stats::StrategyStatistics;

use super::suggestion::Suggestion;
use super::SuggestionEngine;

/// Several independent engines on one instrument. Each bar every engine is
/// evaluated and the suggestion with the highest win percent is kept; the
/// earlier engine wins ties.
pub struct BestOfRoots {
    label: String,
    engines: Vec<Box<dyn SuggestionEngine>>,
    last_statistics: Vec<StrategyStatistics>,
}

impl BestOfRoots {
    pub fn new(label: impl Into<String>, engines: Vec<Box<dyn SuggestionEngine>>) -> Self {
        Self {
            label: label.into(),
            engines,
            last_statistics: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl SuggestionEngine for BestOfRoots {
    fn label(&self) -> &str {
        &self.label
    }

    fn evaluate(&mut self, bar: usize) -> Option<Suggestion> {
        self.last_statistics.clear();
        let mut best: Option<Suggestion> = None;
        for engine in &mut self.engines {
            let candidate = engine.evaluate(bar);
            self.last_statistics
                .extend(engine.last_statistics().iter().cloned());
            best = match (best, candidate) {
                (Some(b), Some(c)) if c.highest_percent > b.highest_percent => Some(c),
                (None, c) => c,
                (b, _) => b,
            };
        }
        best
    }

    fn last_statistics(&self) -> &[StrategyStatistics] {
        &self.last_statistics
    }

    fn active_orders(&self) -> usize {
        self.engines.iter().map(|e| e.active_orders()).sum()
    }
}
