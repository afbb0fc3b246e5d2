//! Run configuration. Every field has a default, so a partial JSON file (or
//! none at all) is enough; the CLI overrides on top.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{DataWindow, UniverseConfig};
use crate::runner::FailurePolicy;
use crate::simulation::CostModel;
use crate::strategy::{
    RsiBbParams, RsiBbStrategy, SmaCrossParams, SmaCrossStrategy, Strategy, VwapReversionParams,
    VwapReversionStrategy,
};
use crate::types::Frequency;

/// 2025-02-01T00:00:00Z
const DEFAULT_START_SECS: i64 = 1_738_368_000;
/// 2025-02-28T00:00:00Z
const DEFAULT_END_SECS: i64 = 1_740_700_800;

fn utc(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub cache_path: PathBuf,
    pub api_base: String,
    pub universe: UniverseConfig,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub frequency: Frequency,
    pub limit: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from("data/btc_1m_feb25.parquet"),
            api_base: "https://api.binance.com".to_string(),
            universe: UniverseConfig::default(),
            start: utc(DEFAULT_START_SECS),
            end: utc(DEFAULT_END_SECS),
            frequency: Frequency::Minute1,
            limit: 1_000,
        }
    }
}

impl DataConfig {
    pub fn window(&self) -> DataWindow {
        DataWindow {
            start: self.start,
            end: self.end,
            frequency: self.frequency,
            limit: self.limit,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategiesConfig {
    pub sma_cross: SmaCrossParams,
    pub rsi_bb: RsiBbParams,
    pub vwap_reversion: VwapReversionParams,
}

impl StrategiesConfig {
    /// The fixed batch: SMA crossover, RSI + Bollinger, VWAP reversion.
    pub fn build(&self) -> Vec<Box<dyn Strategy>> {
        vec![
            Box::new(SmaCrossStrategy::new(self.sma_cross.clone())),
            Box::new(RsiBbStrategy::new(self.rsi_bb.clone())),
            Box::new(VwapReversionStrategy::new(self.vwap_reversion.clone())),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub data: DataConfig,
    pub costs: CostModel,
    pub strategies: StrategiesConfig,
    pub results_dir: PathBuf,
    pub failure_policy: FailurePolicy,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            costs: CostModel::default(),
            strategies: StrategiesConfig::default(),
            results_dir: PathBuf::from("results"),
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl BacktestConfig {
    /// Defaults, overlaid with `path` when given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let mut cfg: Self = serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
        // Sharpe is annualized with the bar size of the data actually fetched.
        cfg.costs.frequency = cfg.data.frequency;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.costs.validate().context("costs")?;
        anyhow::ensure!(self.data.start < self.data.end, "data.start must be before data.end");
        anyhow::ensure!(self.data.limit > 0, "data.limit must be positive");
        anyhow::ensure!(
            self.costs.frequency == self.data.frequency,
            "costs.frequency ({}) differs from data.frequency ({})",
            self.costs.frequency.as_interval(),
            self.data.frequency.as_interval()
        );
        Ok(())
    }
}
