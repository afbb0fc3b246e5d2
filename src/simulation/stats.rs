use serde::{Deserialize, Serialize};

use crate::simulation::Trade;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeCounters {
    pub closed: u64,
    pub winners: u64,
    pub losers: u64,
    /// 1 when a position was still open at the last bar.
    pub open: u64,
}

impl TradeCounters {
    pub fn from_trades(trades: &[Trade], still_open: bool) -> Self {
        Self {
            closed: trades.len() as u64,
            winners: trades.iter().filter(|t| t.pnl > 0.0).count() as u64,
            losers: trades.iter().filter(|t| t.pnl < 0.0).count() as u64,
            open: u64::from(still_open),
        }
    }

    pub fn win_rate(&self) -> Option<f64> {
        if self.closed == 0 {
            return None;
        }
        Some(self.winners as f64 / self.closed as f64)
    }
}

/// Raw statistics surface of one simulation run.
///
/// Fractions are unscaled (0.12 = 12%) except `exposure_time_pct`. Statistics
/// that are undefined for the run (no trades, flat equity, no bars) are `None`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub start_value: f64,
    pub end_value: f64,
    pub total_return: f64,
    pub sharpe_ratio: Option<f64>,
    /// Largest peak-to-trough decline, as a non-positive fraction.
    pub max_drawdown: f64,
    pub win_rate: Option<f64>,
    /// Mean PnL per closed trade, in cash units.
    pub expectancy: Option<f64>,
    pub exposure_time_pct: Option<f64>,
    pub total_fees: f64,
    pub trades: TradeCounters,
}

impl SimulationStats {
    pub fn compute(
        init_cash: f64,
        equity: &[f64],
        exposed_bars: usize,
        trades: &[Trade],
        still_open: bool,
        bars_per_year: f64,
    ) -> Self {
        let end_value = equity.last().copied().unwrap_or(init_cash);
        let returns = bar_returns(init_cash, equity);
        let counters = TradeCounters::from_trades(trades, still_open);
        let expectancy = (!trades.is_empty())
            .then(|| trades.iter().map(|t| t.pnl).sum::<f64>() / trades.len() as f64);

        Self {
            start_value: init_cash,
            end_value,
            total_return: end_value / init_cash - 1.0,
            sharpe_ratio: sharpe_ratio(&returns, bars_per_year),
            max_drawdown: max_drawdown(equity),
            win_rate: counters.win_rate(),
            expectancy,
            exposure_time_pct: (!equity.is_empty())
                .then(|| exposed_bars as f64 / equity.len() as f64 * 100.0),
            total_fees: trades.iter().map(|t| t.fees).sum(),
            trades: counters,
        }
    }
}

/// Simple per-bar returns; the first bar is measured against the starting cash.
pub fn bar_returns(init_cash: f64, equity: &[f64]) -> Vec<f64> {
    let mut prev = init_cash;
    equity
        .iter()
        .map(|&v| {
            let r = if prev == 0.0 { 0.0 } else { v / prev - 1.0 };
            prev = v;
            r
        })
        .collect()
}

/// Annualized Sharpe ratio (zero risk-free rate, sample std).
pub fn sharpe_ratio(returns: &[f64], bars_per_year: f64) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = var.sqrt();
    if !(std.is_finite() && std > 0.0) {
        return None;
    }
    Some(mean / std * bars_per_year.sqrt())
}

pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0f64;
    for &v in equity {
        peak = peak.max(v);
        if peak > 0.0 {
            worst = worst.min(v / peak - 1.0);
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::PositionSide;

    fn trade(pnl: f64) -> Trade {
        Trade {
            side: PositionSide::Long,
            entry_idx: 0,
            exit_idx: 1,
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            size: 1.0,
            fees: 0.1,
            pnl,
            return_frac: pnl / 100.0,
        }
    }

    #[test]
    fn drawdown_tracks_running_peak() {
        let dd = max_drawdown(&[100.0, 110.0, 105.0, 115.0, 100.0]);
        assert!((dd - (100.0 / 115.0 - 1.0)).abs() < 1e-12);
        assert_eq!(max_drawdown(&[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn sharpe_undefined_for_flat_returns() {
        assert_eq!(sharpe_ratio(&[0.01, 0.01, 0.01], 252.0), None);
        assert_eq!(sharpe_ratio(&[0.01], 252.0), None);
        assert!(sharpe_ratio(&[0.01, 0.02, -0.005], 252.0).unwrap() > 0.0);
    }

    #[test]
    fn win_rate_and_expectancy_need_closed_trades() {
        let s = SimulationStats::compute(100.0, &[100.0, 100.0], 0, &[], false, 525_600.0);
        assert_eq!(s.win_rate, None);
        assert_eq!(s.expectancy, None);
        assert_eq!(s.exposure_time_pct, Some(0.0));

        let trades = [trade(10.0), trade(-5.0), trade(20.0), trade(-3.0), trade(15.0)];
        let s = SimulationStats::compute(100.0, &[100.0, 137.0], 1, &trades, true, 525_600.0);
        assert!((s.win_rate.unwrap() - 0.6).abs() < 1e-12);
        assert!((s.expectancy.unwrap() - 7.4).abs() < 1e-12);
        assert!((s.total_return - 0.37).abs() < 1e-12);
        assert_eq!(s.exposure_time_pct, Some(50.0));
        assert_eq!(s.trades.open, 1);
        assert_eq!(s.trades.losers, 2);
    }

    #[test]
    fn empty_run_has_no_exposure() {
        let s = SimulationStats::compute(100.0, &[], 0, &[], false, 525_600.0);
        assert_eq!(s.exposure_time_pct, None);
        assert_eq!(s.total_return, 0.0);
    }
}
