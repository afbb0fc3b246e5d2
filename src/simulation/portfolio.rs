use crate::error::SimulationError;
use crate::simulation::stats::SimulationStats;
use crate::simulation::{CostModel, PositionSide, SimulationEngine, SimulationResult, Trade};
use crate::strategy::{SignalFrame, TradeDirection};
use crate::types::PriceBarSeries;

/// Signal-driven single-position portfolio.
///
/// Per bar, in order: an open position is closed on `exit` or on an entry in
/// the opposite direction; then, if flat, a new position is opened on an
/// entry signal. A bar that closes a position may reverse it in the same bar
/// but never re-opens in the direction it just left, and an entry on a flat
/// bar that also carries `exit` is skipped. Short entries are ignored for
/// [`TradeDirection::LongOnly`].
///
/// An `exit` always closes an open position, even when the same bar repeats
/// the entry for the side already held. Engines that ignore such conflicting
/// bars instead will keep the position open there.
#[derive(Clone, Debug, Default)]
pub struct SignalPortfolio {
    costs: CostModel,
}

#[derive(Clone, Debug)]
struct OpenPosition {
    side: PositionSide,
    entry_idx: usize,
    entry_price: f64,
    size: f64,
    entry_fee: f64,
    committed: f64,
}

impl SignalPortfolio {
    pub fn new(costs: CostModel) -> Self {
        Self { costs }
    }

    pub fn costs(&self) -> &CostModel {
        &self.costs
    }

    fn open(&self, cash: &mut f64, side: PositionSide, idx: usize, close: f64) -> OpenPosition {
        let price = close * (1.0 + side.sign() * self.costs.slippage);
        let committed = *cash;
        let size = committed / (price * (1.0 + self.costs.fees));
        let fee = size * price * self.costs.fees;
        match side {
            PositionSide::Long => *cash -= size * price + fee,
            PositionSide::Short => *cash += size * price - fee,
        }
        OpenPosition {
            side,
            entry_idx: idx,
            entry_price: price,
            size,
            entry_fee: fee,
            committed,
        }
    }

    fn close(&self, cash: &mut f64, pos: OpenPosition, idx: usize, close: f64) -> Trade {
        let price = close * (1.0 - pos.side.sign() * self.costs.slippage);
        let fee = pos.size * price * self.costs.fees;
        match pos.side {
            PositionSide::Long => *cash += pos.size * price - fee,
            PositionSide::Short => *cash -= pos.size * price + fee,
        }
        let gross = pos.side.sign() * pos.size * (price - pos.entry_price);
        let pnl = gross - pos.entry_fee - fee;
        Trade {
            side: pos.side,
            entry_idx: pos.entry_idx,
            exit_idx: idx,
            entry_price: pos.entry_price,
            exit_price: price,
            size: pos.size,
            fees: pos.entry_fee + fee,
            pnl,
            return_frac: pnl / pos.committed,
        }
    }
}

impl SimulationEngine for SignalPortfolio {
    fn simulate(
        &self,
        series: &PriceBarSeries,
        signals: &SignalFrame,
        direction: TradeDirection,
    ) -> Result<SimulationResult, SimulationError> {
        self.costs.validate()?;
        let closes = series.closes();
        let frame_lengths = [signals.entry_long.len(), signals.entry_short.len(), signals.exit.len()];
        if let Some(&bad) = frame_lengths.iter().find(|&&l| l != closes.len()) {
            return Err(SimulationError::LengthMismatch {
                prices: closes.len(),
                signals: bad,
            });
        }
        if let Some((index, &price)) = closes
            .iter()
            .enumerate()
            .find(|(_, p)| !(p.is_finite() && **p > 0.0))
        {
            return Err(SimulationError::BadPrice { index, price });
        }

        let allow_short = direction == TradeDirection::Both;
        let mut cash = self.costs.init_cash;
        let mut position: Option<OpenPosition> = None;
        let mut trades = Vec::new();
        let mut equity = Vec::with_capacity(closes.len());
        let mut exposed_bars = 0usize;

        for (i, &close) in closes.iter().enumerate() {
            let long_in = signals.entry_long[i];
            let short_in = allow_short && signals.entry_short[i];
            let exit = signals.exit[i];

            let mut just_left = None;
            if let Some(pos) = position.take() {
                let opposite = match pos.side {
                    PositionSide::Long => short_in,
                    PositionSide::Short => long_in,
                };
                if exit || opposite {
                    just_left = Some(pos.side);
                    trades.push(self.close(&mut cash, pos, i, close));
                } else {
                    position = Some(pos);
                }
            }

            if position.is_none() {
                // A bar flagged both ways is ambiguous; stay flat.
                let side = match (long_in, short_in) {
                    (true, false) => Some(PositionSide::Long),
                    (false, true) => Some(PositionSide::Short),
                    _ => None,
                };
                if let Some(side) = side.filter(|s| Some(*s) != just_left) {
                    // An exit flagged while already flat vetoes the entry.
                    if !(exit && just_left.is_none()) {
                        position = Some(self.open(&mut cash, side, i, close));
                    }
                }
            }

            let value = match &position {
                Some(p) => {
                    exposed_bars += 1;
                    cash + p.side.sign() * p.size * close
                }
                None => cash,
            };
            equity.push(value);
        }

        let stats = SimulationStats::compute(
            self.costs.init_cash,
            &equity,
            exposed_bars,
            &trades,
            position.is_some(),
            self.costs.frequency.bars_per_year(),
        );
        tracing::debug!(
            bars = closes.len(),
            trades = trades.len(),
            end_value = stats.end_value,
            "simulation finished"
        );

        Ok(SimulationResult {
            timestamps: series.timestamps(),
            equity,
            trades,
            stats,
        })
    }
}
