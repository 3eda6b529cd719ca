//! Monthly drawdown circuit breaker.

use chrono::{Datelike, NaiveDate};

/// Blocks new entries for the rest of a month once the account has lost more
/// than `max_loss` from the month's first observed value.
#[derive(Debug, Clone)]
pub struct MonthlyBreaker {
    max_loss: f64,
    month: Option<(i32, u32)>,
    baseline: f64,
    tripped: bool,
}

impl MonthlyBreaker {
    pub fn new(max_loss: f64) -> Self {
        Self {
            max_loss,
            month: None,
            baseline: 0.0,
            tripped: false,
        }
    }

    /// Feed the account value for `date`. Returns true if the breaker
    /// tripped on this observation.
    pub fn observe(&mut self, date: NaiveDate, value: f64) -> bool {
        let month = (date.year(), date.month());
        if self.month != Some(month) {
            self.month = Some(month);
            self.baseline = value;
            self.tripped = false;
            return false;
        }
        if !self.tripped && self.baseline - value > self.max_loss {
            self.tripped = true;
            return true;
        }
        false
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn trips_and_resets_next_month() {
        let mut b = MonthlyBreaker::new(1000.0);
        assert!(!b.observe(d(3, 1), 100_000.0));
        assert!(!b.observe(d(3, 4), 99_000.0));
        assert!(!b.is_tripped());
        assert!(b.observe(d(3, 5), 98_999.0));
        assert!(b.is_tripped());
        // Recovery within the month does not clear it.
        assert!(!b.observe(d(3, 6), 101_000.0));
        assert!(b.is_tripped());

        assert!(!b.observe(d(4, 1), 90_000.0));
        assert!(!b.is_tripped());
        assert_eq!(b.baseline(), 90_000.0);
    }

    #[test]
    fn first_observation_of_month_never_trips() {
        let mut b = MonthlyBreaker::new(0.0);
        assert!(!b.observe(d(1, 31), 100.0));
        assert!(!b.observe(d(2, 1), 1.0));
        assert!(!b.is_tripped());
    }
}
