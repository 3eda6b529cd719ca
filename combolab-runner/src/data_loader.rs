//! CSV loading for prices, signals, indicators and bias.
//!
//! Prices define the instrument's bars. Every other file is keyed by date
//! and aligned onto those bars: rows for dates the instrument does not trade
//! are ignored, and bars without a row get a neutral value (no signal, NaN
//! reading, no bias).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use combolab_core::domain::{Bar, Direction, Instrument, InstrumentError};
use combolab_core::signals::{BiasSeries, IndicatorSeries};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: missing 'date' column")]
    MissingDateColumn { path: PathBuf },

    #[error("{path}: line {line}: invalid date '{value}'")]
    BadDate {
        path: PathBuf,
        line: u64,
        value: String,
    },

    #[error("{path}: line {line}, column '{column}': invalid value '{value}'")]
    BadValue {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    #[error(transparent)]
    Instrument(#[from] InstrumentError),
}

/// Read OHLCV bars. Returns an empty vector for a header-only file.
pub fn load_bars(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = reader(path)?;
    rdr.deserialize::<Bar>()
        .map(|row| row.map_err(|source| csv_error(path, source)))
        .collect()
}

/// Read bars and build the instrument.
pub fn load_instrument(ticker: &str, tick_size: f64, path: &Path) -> Result<Instrument, LoadError> {
    let bars = load_bars(path)?;
    warn_malformed(ticker, &bars);
    Ok(Instrument::new(ticker, tick_size, bars)?)
}

/// Log bars whose prices do not bracket properly. They are kept.
pub fn warn_malformed(ticker: &str, bars: &[Bar]) -> usize {
    let bad: Vec<NaiveDate> = bars.iter().filter(|b| !b.is_well_formed()).map(|b| b.date).collect();
    if let Some(first) = bad.first() {
        warn!(ticker, count = bad.len(), first = %first, "malformed bars");
    }
    bad.len()
}

/// Per-strategy found flags. Accepts `1`/`0`, `true`/`false` and empty.
pub fn load_signals(path: &Path, dates: &[NaiveDate]) -> Result<HashMap<String, Vec<bool>>, LoadError> {
    let columns = load_columns(path, dates, false, parse_flag)?;
    Ok(columns.into_iter().collect())
}

/// Indicator readings, one series per column. Empty cells read as NaN.
pub fn load_indicators(path: &Path, dates: &[NaiveDate]) -> Result<Vec<IndicatorSeries>, LoadError> {
    let columns = load_columns(path, dates, f64::NAN, parse_reading)?;
    Ok(columns
        .into_iter()
        .map(|(name, values)| IndicatorSeries::new(name, values))
        .collect())
}

/// Higher-timeframe bias from the first non-date column.
pub fn load_bias(path: &Path, dates: &[NaiveDate]) -> Result<BiasSeries, LoadError> {
    let columns = load_columns(path, dates, None, parse_bias)?;
    let values = columns
        .into_iter()
        .next()
        .map(|(_, values)| values)
        .unwrap_or_else(|| vec![None; dates.len()]);
    Ok(BiasSeries::new(values))
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>, LoadError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| csv_error(path, source))
}

fn csv_error(path: &Path, source: csv::Error) -> LoadError {
    LoadError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a date-keyed, column-per-series file aligned onto `dates`.
///
/// Columns keep their header order.
fn load_columns<T, F>(path: &Path, dates: &[NaiveDate], missing: T, parse: F) -> Result<Vec<(String, Vec<T>)>, LoadError>
where
    T: Clone,
    F: Fn(&str) -> Option<T>,
{
    let index: HashMap<NaiveDate, usize> = dates.iter().enumerate().map(|(i, &d)| (d, i)).collect();
    let mut rdr = reader(path)?;
    let headers = rdr.headers().map_err(|source| csv_error(path, source))?.clone();
    let date_col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("date"))
        .ok_or_else(|| LoadError::MissingDateColumn {
            path: path.to_path_buf(),
        })?;

    let mut columns: Vec<(usize, String, Vec<T>)> = headers
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != date_col)
        .map(|(i, h)| (i, h.to_string(), vec![missing.clone(); dates.len()]))
        .collect();

    for record in rdr.records() {
        let record = record.map_err(|source| csv_error(path, source))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let raw_date = record.get(date_col).unwrap_or("");
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|_| LoadError::BadDate {
            path: path.to_path_buf(),
            line,
            value: raw_date.to_string(),
        })?;
        let Some(&bar) = index.get(&date) else {
            continue;
        };
        for (col, name, values) in &mut columns {
            let raw = record.get(*col).unwrap_or("");
            values[bar] = parse(raw).ok_or_else(|| LoadError::BadValue {
                path: path.to_path_buf(),
                line,
                column: name.clone(),
                value: raw.to_string(),
            })?;
        }
    }

    Ok(columns.into_iter().map(|(_, name, values)| (name, values)).collect())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "" | "0" | "false" => Some(false),
        "1" | "true" => Some(true),
        _ => None,
    }
}

fn parse_reading(raw: &str) -> Option<f64> {
    if raw.is_empty() {
        Some(f64::NAN)
    } else {
        raw.parse().ok()
    }
}

fn parse_bias(raw: &str) -> Option<Option<Direction>> {
    match raw.to_ascii_lowercase().as_str() {
        "" | "none" => Some(None),
        "long" | "up" | "1" => Some(Some(Direction::Long)),
        "short" | "down" | "-1" => Some(Some(Direction::Short)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn dates() -> Vec<NaiveDate> {
        (2..=4).map(|d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap()).collect()
    }

    #[test]
    fn loads_prices_into_instrument() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "spy.csv",
            "date,open,high,low,close,volume\n\
             2024-01-02,100,102,99,101,1000\n\
             2024-01-03,101,103,100,102,1100\n",
        );
        let inst = load_instrument("SPY", 0.01, &path).unwrap();
        assert_eq!(inst.bar_count(), 2);
        assert_eq!(inst.close(1), 102.0);
        assert_eq!(inst.bar_index(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()), Some(1));
    }

    #[test]
    fn malformed_bars_are_counted_not_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "bad.csv",
            "date,open,high,low,close,volume\n\
             2024-01-02,100,99,98,101,1000\n\
             2024-01-03,101,103,100,102,1100\n",
        );
        let bars = load_bars(&path).unwrap();
        assert_eq!(warn_malformed("BAD", &bars), 1);
        assert_eq!(load_instrument("BAD", 0.01, &path).unwrap().bar_count(), 2);
    }

    #[test]
    fn empty_price_file_yields_no_bars() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "e.csv", "date,open,high,low,close,volume\n");
        assert!(load_bars(&path).unwrap().is_empty());
        assert!(matches!(
            load_instrument("E", 0.01, &path),
            Err(LoadError::Instrument(_))
        ));
    }

    #[test]
    fn signals_align_on_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "sig.csv",
            "date,breakout,pullback\n\
             2024-01-01,1,1\n\
             2024-01-02,1,0\n\
             2024-01-04,false,TRUE\n",
        );
        let found = load_signals(&path, &dates()).unwrap();
        // 2024-01-01 is not a bar date; 2024-01-03 has no row.
        assert_eq!(found["breakout"], vec![true, false, false]);
        assert_eq!(found["pullback"], vec![false, false, true]);
    }

    #[test]
    fn indicators_keep_gaps_as_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "ind.csv", "date,rsi_14\n2024-01-02,55.5\n2024-01-03,\n");
        let series = load_indicators(&path, &dates()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].name, "rsi_14");
        assert_eq!(series[0].values[0], 55.5);
        assert!(series[0].values[1].is_nan());
        assert!(series[0].values[2].is_nan());
    }

    #[test]
    fn bias_parses_directions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "bias.csv", "date,bias\n2024-01-02,long\n2024-01-03,Short\n2024-01-04,\n");
        let bias = load_bias(&path, &dates()).unwrap();
        assert_eq!(bias.at(0), Some(Direction::Long));
        assert_eq!(bias.at(1), Some(Direction::Short));
        assert_eq!(bias.at(2), None);
    }

    #[test]
    fn bad_cells_report_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "sig.csv", "date,breakout\n2024-01-02,maybe\n");
        let err = load_signals(&path, &dates()).unwrap_err();
        match err {
            LoadError::BadValue { line, column, value, .. } => {
                assert_eq!(line, 2);
                assert_eq!(column, "breakout");
                assert_eq!(value, "maybe");
            }
            other => panic!("unexpected error: {other}"),
        }

        let path = write(&dir, "d.csv", "date,breakout\n01/02/2024,1\n");
        assert!(matches!(load_signals(&path, &dates()), Err(LoadError::BadDate { .. })));

        let path = write(&dir, "n.csv", "day,breakout\n2024-01-02,1\n");
        assert!(matches!(
            load_signals(&path, &dates()),
            Err(LoadError::MissingDateColumn { .. })
        ));
    }
}
