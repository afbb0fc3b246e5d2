//! Moving-average crossover.
//!
//! Long while SMA(short) sits above SMA(long), flat/exit while it sits below.
//! The comparison is made bar by bar with no hysteresis; bars where either
//! average is still warming up carry no signal.

use serde::{Deserialize, Serialize};

use crate::indicators::sma;
use crate::strategy::{SignalFrame, Strategy, TradeDirection};
use crate::types::PriceBarSeries;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmaCrossParams {
    pub short_window: usize,
    pub long_window: usize,
}

impl Default for SmaCrossParams {
    fn default() -> Self {
        Self {
            short_window: 50,
            long_window: 200,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SmaCrossStrategy {
    name: String,
    params: SmaCrossParams,
}

impl SmaCrossStrategy {
    pub fn new(params: SmaCrossParams) -> Self {
        Self::named("SMA_Cross", params)
    }

    pub fn named(name: impl Into<String>, params: SmaCrossParams) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    pub fn params(&self) -> &SmaCrossParams {
        &self.params
    }
}

impl Strategy for SmaCrossStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn direction(&self) -> TradeDirection {
        TradeDirection::LongOnly
    }

    fn generate_signals(&self, series: &PriceBarSeries) -> SignalFrame {
        let closes = series.closes();
        let short = sma(&closes, self.params.short_window);
        let long = sma(&closes, self.params.long_window);

        let mut frame = SignalFrame::neutral(closes.len());
        for (i, (s, l)) in short.iter().zip(&long).enumerate() {
            let (Some(s), Some(l)) = (s, l) else {
                continue;
            };
            frame.entry_long[i] = s > l;
            frame.entry_short[i] = s < l;
            frame.exit[i] = s < l;
        }
        frame
    }
}
