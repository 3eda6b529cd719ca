//! Deferred diagnostics attached to an order.
//!
//! Entries are `(key, closure)` pairs. Closures run only when the order is
//! exported, so expensive diagnostics cost nothing for orders nobody reads.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use super::order::Order;

type Deferred = Box<dyn Fn(&Order) -> Value + Send + Sync>;

#[derive(Default)]
pub struct ExtraInfo {
    entries: Vec<(String, Deferred)>,
}

impl ExtraInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a closure under `key`. A later entry with the same key wins.
    pub fn defer<F>(&mut self, key: impl Into<String>, f: F)
    where
        F: Fn(&Order) -> Value + Send + Sync + 'static,
    {
        self.entries.push((key.into(), Box::new(f)));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Run every closure against `order`.
    pub fn evaluate(&self, order: &Order) -> BTreeMap<String, Value> {
        self.entries
            .iter()
            .map(|(k, f)| (k.clone(), f(order)))
            .collect()
    }
}

impl fmt::Debug for ExtraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}
