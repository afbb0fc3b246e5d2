//! Metrics reporter: normalizes simulation statistics into the ledger schema,
//! appends them to the CSV ledger and renders the equity screenshot.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::simulation::SimulationResult;

pub mod ledger;
pub mod plot;

pub use ledger::{Ledger, LEDGER_COLUMNS};
pub use plot::EquityPlot;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub strategy_name: Option<String>,
    pub total_return_pct: f64,
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown_pct: f64,
    pub win_rate_pct: Option<f64>,
    pub expectancy: Option<f64>,
    pub exposure_time_pct: Option<f64>,
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Scale fractions to percent and round everything to 2 decimals.
pub fn summarize(strategy_name: &str, result: &SimulationResult) -> MetricsRecord {
    let s = &result.stats;
    MetricsRecord {
        strategy_name: Some(strategy_name.to_string()),
        total_return_pct: round2(s.total_return * 100.0),
        sharpe_ratio: s.sharpe_ratio.map(round2),
        max_drawdown_pct: round2(s.max_drawdown * 100.0),
        win_rate_pct: s.win_rate.map(|w| round2(w * 100.0)),
        expectancy: s.expectancy.map(round2),
        exposure_time_pct: s.exposure_time_pct.map(round2),
    }
}

/// Owns the results directory layout: `<dir>/metrics.csv` and
/// `<dir>/screenshots/<strategy>_equity.png`.
#[derive(Clone, Debug)]
pub struct MetricsReporter {
    results_dir: PathBuf,
    ledger: Ledger,
    plot: EquityPlot,
}

impl MetricsReporter {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        let results_dir = results_dir.into();
        Self {
            ledger: Ledger::new(results_dir.join("metrics.csv")),
            plot: EquityPlot::default(),
            results_dir,
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn screenshot_path(&self, strategy_name: &str) -> PathBuf {
        self.results_dir
            .join("screenshots")
            .join(format!("{}_equity.png", sanitize_file_stem(strategy_name)))
    }

    pub fn persist(&self, record: &MetricsRecord) -> Result<(), ReportError> {
        self.ledger.append(record)
    }

    pub fn render_equity(&self, strategy_name: &str, result: &SimulationResult) -> Result<PathBuf, ReportError> {
        let path = self.screenshot_path(strategy_name);
        self.plot.save(&result.equity, &path)?;
        Ok(path)
    }
}

fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}
