//! Simulation boundary.
//!
//! The runner only talks to [`SimulationEngine`]. [`SignalPortfolio`] is the
//! bundled engine: single position, all-in sizing, proportional fee and
//! slippage on every fill, fills at the bar close.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::strategy::{SignalFrame, TradeDirection};
use crate::types::{Frequency, PriceBarSeries};

pub mod portfolio;
pub mod stats;

pub use portfolio::SignalPortfolio;
pub use stats::{SimulationStats, TradeCounters};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Proportional fee per fill (0.001 = 0.1%).
    pub fees: f64,
    /// Proportional price slippage per fill, always against the trader.
    pub slippage: f64,
    pub init_cash: f64,
    /// Bar size, used to annualize the Sharpe ratio.
    pub frequency: Frequency,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            fees: 0.001,
            slippage: 0.001,
            init_cash: 100.0,
            frequency: Frequency::Minute1,
        }
    }
}

impl CostModel {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.fees.is_finite() && self.fees >= 0.0) {
            return Err(SimulationError::InvalidCosts(format!("fees={}", self.fees)));
        }
        if !(self.slippage.is_finite() && (0.0..1.0).contains(&self.slippage)) {
            return Err(SimulationError::InvalidCosts(format!("slippage={}", self.slippage)));
        }
        if !(self.init_cash.is_finite() && self.init_cash > 0.0) {
            return Err(SimulationError::InvalidCosts(format!("init_cash={}", self.init_cash)));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn sign(self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub side: PositionSide,
    pub entry_idx: usize,
    pub exit_idx: usize,
    /// Fill prices after slippage.
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    /// Entry plus exit fees.
    pub fees: f64,
    pub pnl: f64,
    /// `pnl` relative to the capital committed at entry.
    pub return_frac: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub timestamps: Vec<DateTime<Utc>>,
    /// Portfolio value marked at each bar close.
    pub equity: Vec<f64>,
    /// Closed round trips. A position still open at the last bar is not listed.
    pub trades: Vec<Trade>,
    pub stats: SimulationStats,
}

pub trait SimulationEngine: Send + Sync {
    fn simulate(
        &self,
        series: &PriceBarSeries,
        signals: &SignalFrame,
        direction: TradeDirection,
    ) -> Result<SimulationResult, SimulationError>;
}
