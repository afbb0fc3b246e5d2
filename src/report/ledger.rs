//! Append-only CSV ledger of run metrics.
//!
//! Appending rewrites the whole file (read, extend, write to a sibling, rename),
//! so the last writer wins if two runs overlap. Rows are never deduplicated.

use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::error::ReportError;
use crate::report::MetricsRecord;

pub const LEDGER_COLUMNS: [&str; 7] = [
    "Total Return",
    "Sharpe Ratio",
    "Max Drawdown",
    "Win Rate",
    "Expectancy",
    "Exposure Time",
    "Strategy",
];

#[derive(Clone, Debug)]
pub struct Ledger {
    path: PathBuf,
}

/// Raw ledger contents: header plus rows as stored, padded to the header width.
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl LedgerTable {
    fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Add any ledger column the header lacks, with empty cells for existing rows.
    fn backfill_columns(&mut self) -> Vec<&'static str> {
        let mut added = Vec::new();
        for name in LEDGER_COLUMNS {
            if self.column(name).is_none() {
                self.header.push(name.to_string());
                added.push(name);
            }
        }
        let width = self.header.len();
        for row in &mut self.rows {
            row.resize(width, String::new());
        }
        added
    }

    fn push_record(&mut self, record: &MetricsRecord) {
        let row = self
            .header
            .iter()
            .map(|name| cell_for(record, name))
            .collect();
        self.rows.push(row);
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn cell_for(record: &MetricsRecord, column: &str) -> String {
    match column {
        "Total Return" => record.total_return_pct.to_string(),
        "Sharpe Ratio" => fmt_opt(record.sharpe_ratio),
        "Max Drawdown" => record.max_drawdown_pct.to_string(),
        "Win Rate" => fmt_opt(record.win_rate_pct),
        "Expectancy" => fmt_opt(record.expectancy),
        "Exposure Time" => fmt_opt(record.exposure_time_pct),
        "Strategy" => record.strategy_name.clone().unwrap_or_default(),
        _ => String::new(),
    }
}

fn parse_cell(row: &[String], idx: Option<usize>) -> Option<f64> {
    let cell = row.get(idx?)?.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse().ok()
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents, or `None` if the ledger does not exist yet (or is empty).
    pub fn read(&self) -> Result<Option<LedgerTable>, ReportError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;
        let mut header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if header.is_empty() || header.iter().all(|h| h.is_empty()) {
            return Ok(None);
        }
        let mut rows = Vec::new();
        for rec in reader.records() {
            let rec: StringRecord = rec?;
            rows.push(rec.iter().map(str::to_string).collect::<Vec<_>>());
        }
        // Rows wider than the header keep their extra cells under unnamed columns.
        let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(header.len());
        header.resize(width, String::new());
        for row in &mut rows {
            row.resize(width, String::new());
        }
        Ok(Some(LedgerTable { header, rows }))
    }

    pub fn append(&self, record: &MetricsRecord) -> Result<(), ReportError> {
        let mut table = match self.read()? {
            Some(table) => table,
            None => LedgerTable {
                header: LEDGER_COLUMNS.iter().map(|c| c.to_string()).collect(),
                rows: Vec::new(),
            },
        };
        let added = table.backfill_columns();
        if !added.is_empty() && !table.rows.is_empty() {
            tracing::info!(path = %self.path.display(), columns = ?added, "backfilled ledger columns");
        }
        table.push_record(record);
        self.write(&table)
    }

    /// Parse every row back into a [`MetricsRecord`]. Empty or unparseable cells are absent.
    pub fn records(&self) -> Result<Vec<MetricsRecord>, ReportError> {
        let Some(table) = self.read()? else {
            return Ok(Vec::new());
        };
        let idx = |name: &str| table.column(name);
        Ok(table
            .rows
            .iter()
            .map(|row| MetricsRecord {
                strategy_name: idx("Strategy")
                    .and_then(|i| row.get(i))
                    .filter(|s| !s.is_empty())
                    .cloned(),
                total_return_pct: parse_cell(row, idx("Total Return")).unwrap_or(f64::NAN),
                sharpe_ratio: parse_cell(row, idx("Sharpe Ratio")),
                max_drawdown_pct: parse_cell(row, idx("Max Drawdown")).unwrap_or(f64::NAN),
                win_rate_pct: parse_cell(row, idx("Win Rate")),
                expectancy: parse_cell(row, idx("Expectancy")),
                exposure_time_pct: parse_cell(row, idx("Exposure Time")),
            })
            .collect())
    }

    fn write(&self, table: &LedgerTable) -> Result<(), ReportError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ReportError::io(parent, e))?;
        }
        let tmp = self.path.with_extension("csv.partial");
        let mut writer = WriterBuilder::new().from_path(&tmp)?;
        writer.write_record(&table.header)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush().map_err(|e| ReportError::io(&tmp, e))?;
        drop(writer);
        std::fs::rename(&tmp, &self.path).map_err(|e| ReportError::io(&self.path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(name: &str, ret: f64) -> MetricsRecord {
        MetricsRecord {
            strategy_name: Some(name.to_string()),
            total_return_pct: ret,
            sharpe_ratio: Some(1.5),
            max_drawdown_pct: -3.25,
            win_rate_pct: Some(50.0),
            expectancy: Some(0.12),
            exposure_time_pct: None,
        }
    }

    #[test]
    fn creates_ledger_with_header_and_row() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("results").join("metrics.csv"));
        ledger.append(&record("SMA_Cross", 12.34)).unwrap();

        let text = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(
            text,
            "Total Return,Sharpe Ratio,Max Drawdown,Win Rate,Expectancy,Exposure Time,Strategy\n\
             12.34,1.5,-3.25,50,0.12,,SMA_Cross\n"
        );
    }

    #[test]
    fn reruns_append_duplicates_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("metrics.csv"));
        ledger.append(&record("A", 1.0)).unwrap();
        ledger.append(&record("B", 2.0)).unwrap();
        ledger.append(&record("A", 1.0)).unwrap();

        let names: Vec<Option<String>> = ledger.records().unwrap().into_iter().map(|r| r.strategy_name).collect();
        assert_eq!(
            names,
            vec![Some("A".into()), Some("B".into()), Some("A".into())]
        );
        let recs = ledger.records().unwrap();
        assert_eq!(recs[2].exposure_time_pct, None);
        assert_eq!(recs[1].total_return_pct, 2.0);
    }

    #[test]
    fn old_ledger_without_strategy_column_is_backfilled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        let old = "Total Return,Sharpe Ratio,Max Drawdown,Win Rate,Expectancy,Exposure Time\n\
                   5.5,0.8,-1.0,40.0,0.01,12.5\n\
                   -2.0,,-7.75,,,\n";
        std::fs::write(&path, old).unwrap();

        let ledger = Ledger::new(&path);
        ledger.append(&record("VWAP_Reversion", 3.0)).unwrap();

        let table = ledger.read().unwrap().unwrap();
        assert_eq!(table.header.last().map(String::as_str), Some("Strategy"));
        // prior cells are carried over verbatim, with an empty strategy
        assert_eq!(table.rows[0], vec!["5.5", "0.8", "-1.0", "40.0", "0.01", "12.5", ""]);
        assert_eq!(table.rows[1], vec!["-2.0", "", "-7.75", "", "", "", ""]);
        assert_eq!(table.rows[2][6], "VWAP_Reversion");
        assert_eq!(table.rows.len(), 3);
    }

    #[test]
    fn unknown_columns_survive_and_stay_empty_for_new_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        std::fs::write(&path, "Strategy,Note,Total Return\nold,hand-edited,1.0\n").unwrap();

        let ledger = Ledger::new(&path);
        ledger.append(&record("new", 2.0)).unwrap();

        let table = ledger.read().unwrap().unwrap();
        assert_eq!(&table.header[..3], &["Strategy", "Note", "Total Return"]);
        assert_eq!(&table.rows[0][..3], &["old", "hand-edited", "1.0"]);
        assert_eq!(&table.rows[1][..3], &["new", "", "2"]);
    }

    #[test]
    fn overlong_rows_keep_their_extra_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        std::fs::write(&path, "Total Return,Strategy\n1.0,old,stray,cells\n").unwrap();

        let ledger = Ledger::new(&path);
        ledger.append(&record("new", 2.0)).unwrap();

        let table = ledger.read().unwrap().unwrap();
        assert_eq!(&table.rows[0][..4], &["1.0", "old", "stray", "cells"]);
        assert_eq!(&table.header[..4], &["Total Return", "Strategy", "", ""]);
        assert_eq!(&table.rows[1][..4], &["2", "new", "", ""]);
        assert!(table.rows.iter().all(|r| r.len() == table.header.len()));
    }

    #[test]
    fn append_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        let ledger = Ledger::new(&path);
        ledger.append(&record("A", 1.0)).unwrap();
        ledger.append(&record("B", 2.0)).unwrap();
        assert!(!path.with_extension("csv.partial").exists());
        assert_eq!(ledger.records().unwrap().len(), 2);
    }

    #[test]
    fn empty_file_is_treated_as_new() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        std::fs::write(&path, "").unwrap();
        let ledger = Ledger::new(&path);
        ledger.append(&record("A", 1.0)).unwrap();
        assert_eq!(ledger.records().unwrap().len(), 1);
    }
}
