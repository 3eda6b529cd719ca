//! Artifact export: JSON report plus CSV tapes.
//!
//! - **JSON**: the full `RunReport`, schema-versioned
//! - **CSV**: account orders, value series and ranked candidates
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use combolab_core::orders::OrderRecord;
use combolab_core::simulation::ValuePoint;
use combolab_core::strategy::RankedCandidate;

use crate::runner::{RunReport, SCHEMA_VERSION};

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize run report to JSON")
}

/// Deserialize a report, rejecting schema versions newer than this build.
pub fn import_json(json: &str) -> Result<RunReport> {
    let report: RunReport = serde_json::from_str(json).context("failed to deserialize run report from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Columns: id, ticker, combo, direction, status, size, shares, buy_date,
/// buy_price, buy_reason, sell_date, sell_price, sell_reason, gain, value.
pub fn export_orders_csv(orders: &[OrderRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "id",
        "ticker",
        "combo",
        "direction",
        "status",
        "size",
        "shares",
        "buy_date",
        "buy_price",
        "buy_reason",
        "sell_date",
        "sell_price",
        "sell_reason",
        "gain",
        "value",
    ])?;

    for o in orders {
        wtr.write_record([
            o.id.0.to_string(),
            o.ticker.clone(),
            o.strategy.clone(),
            o.direction.to_string(),
            format!("{:?}", o.status),
            format!("{:.2}", o.size),
            format!("{:.0}", o.shares),
            o.buy_date.map(|d| d.to_string()).unwrap_or_default(),
            format!("{:.4}", o.buy_price),
            o.buy_reason.clone().unwrap_or_default(),
            o.sell_date.map(|d| d.to_string()).unwrap_or_default(),
            format!("{:.4}", o.sell_price),
            o.sell_reason.clone().unwrap_or_default(),
            format!("{:.2}", o.gain),
            format!("{:.2}", o.value),
        ])?;
    }

    finish(wtr)
}

pub fn export_equity_csv(series: &[ValuePoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "cash", "value"])?;
    for p in series {
        wtr.write_record([p.date.to_string(), format!("{:.2}", p.cash), format!("{:.2}", p.value)])?;
    }
    finish(wtr)
}

pub fn export_candidates_csv(candidates: &[RankedCandidate]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "rank",
        "ticker",
        "combo",
        "direction",
        "highest_percent",
        "gain",
        "expected_gain",
    ])?;
    for c in candidates {
        wtr.write_record([
            c.date.to_string(),
            c.rank.to_string(),
            c.ticker.clone(),
            c.name.clone(),
            c.direction.to_string(),
            format!("{:.2}", c.highest_percent),
            format!("{:.2}", c.gain),
            c.expected_gain.map(|g| format!("{g:.2}")).unwrap_or_default(),
        ])?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a run.
///
/// Creates `{run_id[..12]}_{timestamp}/` under `output_dir` containing
/// `report.json`, `orders.csv`, `equity.csv` and `candidates.csv`.
/// Returns the path to the created directory.
pub fn save_artifacts(report: &RunReport, output_dir: &Path) -> Result<PathBuf> {
    let short_id: String = report.run_id.chars().take(12).collect();
    let dirname = format!("{}_{}", short_id, chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write(&run_dir.join("report.json"), &export_json(report)?)?;
    write(&run_dir.join("orders.csv"), &export_orders_csv(&report.result.closed_orders)?)?;
    write(&run_dir.join("equity.csv"), &export_equity_csv(&report.result.value_series)?)?;
    write(
        &run_dir.join("candidates.csv"),
        &export_candidates_csv(&report.result.candidates)?,
    )?;

    Ok(run_dir)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use combolab_core::domain::{Direction, OrderId};
    use combolab_core::orders::OrderStatus;
    use combolab_core::{RunResult, SimulationConfig};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn record() -> OrderRecord {
        OrderRecord {
            id: OrderId(7),
            ticker: "SPY".into(),
            strategy: "a-b".into(),
            direction: Direction::Short,
            status: OrderStatus::Closed,
            size: 1000.0,
            shares: 10.0,
            opened_bar: 1,
            buy_bar: Some(2),
            buy_date: Some(date(3)),
            buy_price: 100.0,
            buy_reason: Some("market".into()),
            sell_bar: Some(4),
            sell_date: Some(date(5)),
            sell_price: 95.0,
            sell_reason: Some("profit target".into()),
            gain: 49.0,
            value: 1049.0,
            dependent_indicators: vec![],
            extra: Default::default(),
        }
    }

    fn report() -> RunReport {
        RunReport {
            schema_version: SCHEMA_VERSION,
            run_id: "ab".repeat(32),
            synthetic: false,
            tickers: vec!["SPY".into()],
            config: SimulationConfig::default(),
            result: RunResult {
                initial_cash: 1000.0,
                final_cash: 1049.0,
                final_value: 1049.0,
                closed_orders: vec![record()],
                value_series: vec![ValuePoint {
                    date: date(5),
                    cash: 1049.0,
                    value: 1049.0,
                }],
                candidates: vec![RankedCandidate {
                    date: date(1),
                    rank: 1,
                    ticker: "SPY".into(),
                    name: "a-b".into(),
                    direction: Direction::Short,
                    highest_percent: 60.0,
                    gain: 120.0,
                    expected_gain: None,
                }],
                ..RunResult::default()
            },
        }
    }

    #[test]
    fn orders_csv_has_header_and_row() {
        let csv = export_orders_csv(&[record()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("id,ticker,combo,direction,status"));
        assert_eq!(
            lines[1],
            "7,SPY,a-b,short,Closed,1000.00,10,2024-03-03,100.0000,market,2024-03-05,95.0000,profit target,49.00,1049.00"
        );
    }

    #[test]
    fn candidates_csv_leaves_missing_expectancy_blank() {
        let csv = export_candidates_csv(&report().result.candidates).unwrap();
        assert_eq!(csv.lines().nth(1), Some("2024-03-01,1,SPY,a-b,short,60.00,120.00,"));
    }

    #[test]
    fn json_roundtrip_and_version_gate() {
        let json = export_json(&report()).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.result, report().result);

        let future = json.replacen(
            &format!("\"schema_version\": {SCHEMA_VERSION}"),
            "\"schema_version\": 99",
            1,
        );
        assert!(import_json(&future).is_err());
    }

    #[test]
    fn save_artifacts_writes_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_artifacts(&report(), dir.path()).unwrap();
        assert!(run_dir.file_name().unwrap().to_string_lossy().starts_with("abababababab_"));
        for name in ["report.json", "orders.csv", "equity.csv", "candidates.csv"] {
            assert!(run_dir.join(name).is_file(), "missing {name}");
        }
        let equity = std::fs::read_to_string(run_dir.join("equity.csv")).unwrap();
        assert_eq!(equity, "date,cash,value\n2024-03-05,1049.00,1049.00\n");
    }
}
