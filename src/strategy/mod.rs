//! Signal generators.
//!
//! Each strategy is a pure function from a bar series to a [`SignalFrame`]:
//! three boolean columns aligned 1:1 with the bars. The tri-state `+1/-1/0`
//! view is available per bar through [`SignalFrame::action`].

use serde::{Deserialize, Serialize};

use crate::types::PriceBarSeries;

pub mod rsi_bb;
pub mod sma_cross;
pub mod vwap_reversion;

pub use rsi_bb::{RsiBbParams, RsiBbStrategy};
pub use sma_cross::{SmaCrossParams, SmaCrossStrategy};
pub use vwap_reversion::{VwapReversionParams, VwapReversionStrategy};

/// Which entry columns the simulation should act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeDirection {
    LongOnly,
    Both,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalAction {
    Long,
    Short,
    Flat,
}

impl SignalAction {
    pub fn as_i8(self) -> i8 {
        match self {
            SignalAction::Long => 1,
            SignalAction::Short => -1,
            SignalAction::Flat => 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalFrame {
    pub entry_long: Vec<bool>,
    pub entry_short: Vec<bool>,
    pub exit: Vec<bool>,
}

impl SignalFrame {
    /// All-false frame of `len` bars.
    pub fn neutral(len: usize) -> Self {
        Self {
            entry_long: vec![false; len],
            entry_short: vec![false; len],
            exit: vec![false; len],
        }
    }

    pub fn len(&self) -> usize {
        self.entry_long.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_long.is_empty()
    }

    /// Tri-state projection of bar `i`. A long entry outranks short/exit on the same bar.
    pub fn action(&self, i: usize) -> SignalAction {
        if self.entry_long.get(i).copied().unwrap_or(false) {
            SignalAction::Long
        } else if self.entry_short.get(i).copied().unwrap_or(false)
            || self.exit.get(i).copied().unwrap_or(false)
        {
            SignalAction::Short
        } else {
            SignalAction::Flat
        }
    }

    pub fn actions(&self) -> Vec<SignalAction> {
        (0..self.len()).map(|i| self.action(i)).collect()
    }
}

pub trait Strategy: Send + Sync {
    /// Stable name used for the ledger row and the screenshot file.
    fn name(&self) -> &str;

    fn direction(&self) -> TradeDirection;

    fn generate_signals(&self, series: &PriceBarSeries) -> SignalFrame;
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::types::{PairId, PriceBar, PriceBarSeries};
    use chrono::{TimeZone, Utc};

    /// Minute bars with high/low one unit around close and constant volume.
    pub fn series_from_closes(closes: &[f64]) -> PriceBarSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar {
                timestamp: Utc.timestamp_opt(1_738_368_000 + i as i64 * 60, 0).unwrap(),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1_000.0,
                pair: PairId("BTC/USDT".into()),
            })
            .collect();
        PriceBarSeries::new(bars)
    }
}
