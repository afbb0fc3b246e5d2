//! Batch runner: every registered strategy, in declared order, through
//! signals -> simulation -> summary -> screenshot -> ledger.

use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::report::{summarize, MetricsRecord, MetricsReporter};
use crate::simulation::{SimulationEngine, SimulationResult};
use crate::strategy::Strategy;
use crate::types::{PriceBarSeries, StrategyName};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the batch at the first failing strategy.
    #[default]
    Abort,
    /// Log the failure and move on to the next strategy.
    Continue,
}

#[derive(Debug)]
pub struct StrategyRun {
    pub strategy: StrategyName,
    pub record: MetricsRecord,
    pub result: SimulationResult,
    /// `None` if the image could not be written.
    pub screenshot: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrategyFailure {
    pub strategy: StrategyName,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub completed: Vec<StrategyRun>,
    pub failed: Vec<StrategyFailure>,
}

impl BatchReport {
    pub fn records(&self) -> Vec<&MetricsRecord> {
        self.completed.iter().map(|r| &r.record).collect()
    }
}

pub struct BatchRunner<E> {
    engine: E,
    strategies: Vec<Box<dyn Strategy>>,
    reporter: MetricsReporter,
    policy: FailurePolicy,
}

impl<E: SimulationEngine> BatchRunner<E> {
    pub fn new(engine: E, reporter: MetricsReporter) -> Self {
        Self {
            engine,
            strategies: Vec::new(),
            reporter,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register a strategy. Strategies run in registration order.
    pub fn register(mut self, strategy: Box<dyn Strategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn reporter(&self) -> &MetricsReporter {
        &self.reporter
    }

    pub fn run_single(&self, strategy: &dyn Strategy, series: &PriceBarSeries) -> anyhow::Result<StrategyRun> {
        let name = strategy.name();
        let signals = strategy.generate_signals(series);
        let result = self
            .engine
            .simulate(series, &signals, strategy.direction())
            .with_context(|| format!("simulating {name}"))?;
        let record = summarize(name, &result);

        let screenshot = match self.reporter.render_equity(name, &result) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(strategy = %name, error = %e, "equity screenshot failed");
                None
            }
        };

        self.reporter
            .persist(&record)
            .with_context(|| format!("appending {name} to {}", self.reporter.ledger().path().display()))?;

        tracing::info!(
            strategy = %name,
            total_return_pct = record.total_return_pct,
            sharpe = ?record.sharpe_ratio,
            max_drawdown_pct = record.max_drawdown_pct,
            trades = result.trades.len(),
            "strategy complete"
        );
        Ok(StrategyRun {
            strategy: StrategyName(name.to_string()),
            record,
            result,
            screenshot,
        })
    }

    pub fn run(&self, series: &PriceBarSeries) -> anyhow::Result<BatchReport> {
        let mut report = BatchReport::default();
        tracing::info!(bars = series.len(), strategies = self.strategies.len(), policy = ?self.policy, "batch start");
        for strategy in &self.strategies {
            match self.run_single(strategy.as_ref(), series) {
                Ok(run) => report.completed.push(run),
                Err(e) => match self.policy {
                    FailurePolicy::Abort => {
                        return Err(e.context(format!("strategy {} failed", strategy.name())));
                    }
                    FailurePolicy::Continue => {
                        tracing::error!(strategy = %strategy.name(), error = %format!("{e:#}"), "strategy failed; continuing");
                        report.failed.push(StrategyFailure {
                            strategy: StrategyName(strategy.name().to_string()),
                            error: format!("{e:#}"),
                        });
                    }
                },
            }
        }
        tracing::info!(completed = report.completed.len(), failed = report.failed.len(), "batch done");
        Ok(report)
    }
}
