//! RSI oversold + Bollinger lower-band bounce.
//!
//! Entry needs a two-bar transition: close below the lower band on the
//! previous bar, back at/above it on this bar, with RSI under 30 now.
//! Exit is the mirror transition through the middle band (above, then below).

use serde::{Deserialize, Serialize};

use crate::indicators::{bollinger, rsi};
use crate::strategy::{SignalFrame, Strategy, TradeDirection};
use crate::types::PriceBarSeries;

const RSI_OVERSOLD: f64 = 30.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiBbParams {
    pub rsi_period: usize,
    pub bb_window: usize,
    pub bb_std: f64,
}

impl Default for RsiBbParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            bb_window: 20,
            bb_std: 2.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RsiBbStrategy {
    name: String,
    params: RsiBbParams,
}

impl RsiBbStrategy {
    pub fn new(params: RsiBbParams) -> Self {
        Self::named("RSI_BB", params)
    }

    pub fn named(name: impl Into<String>, params: RsiBbParams) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

impl Strategy for RsiBbStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn direction(&self) -> TradeDirection {
        TradeDirection::LongOnly
    }

    fn generate_signals(&self, series: &PriceBarSeries) -> SignalFrame {
        let closes = series.closes();
        let rsi = rsi(&closes, self.params.rsi_period);
        let bands = bollinger(&closes, self.params.bb_window, self.params.bb_std);

        let mut frame = SignalFrame::neutral(closes.len());
        for i in 1..closes.len() {
            let (prev, now) = (closes[i - 1], closes[i]);
            let (Some(bb_prev), Some(bb_now)) = (bands[i - 1], bands[i]) else {
                continue;
            };

            let bounced = prev < bb_prev.lower && now >= bb_now.lower;
            let oversold = rsi[i].is_some_and(|r| r < RSI_OVERSOLD);
            frame.entry_long[i] = bounced && oversold;

            frame.exit[i] = prev > bb_prev.middle && now < bb_now.middle;
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::series_from_closes;
    use crate::strategy::SignalAction;

    fn params() -> RsiBbParams {
        RsiBbParams {
            rsi_period: 3,
            bb_window: 5,
            bb_std: 1.0,
        }
    }

    #[test]
    fn frame_is_aligned_with_bars() {
        let closes = [
            100.0, 98.0, 96.0, 94.0, 92.0, 91.0, 90.0, 89.0, 88.0, 87.0, 86.0, 85.0, 84.0, 83.0, 82.0,
            81.0, 80.0, 81.0, 82.0, 83.0, 84.0,
        ];
        let frame = RsiBbStrategy::new(RsiBbParams::default()).generate_signals(&series_from_closes(&closes));
        assert_eq!(frame.len(), closes.len());
        assert_eq!(frame.action(0), SignalAction::Flat);
    }

    #[test]
    fn bounce_after_selloff_enters() {
        // Steady slide, a sharp flush below the band, then a recovery back inside it
        // while RSI is still depressed.
        let closes = [100.0, 98.0, 96.0, 94.0, 92.0, 90.0, 88.0, 80.0, 83.0];
        let frame = RsiBbStrategy::new(params()).generate_signals(&series_from_closes(&closes));
        assert!(frame.entry_long[8], "{frame:?}");
        assert_eq!(frame.entry_long.iter().filter(|e| **e).count(), 1);
    }

    #[test]
    fn entry_needs_previous_bar_below_band() {
        // Bar 8 closes inside the band with RSI under 30, but bar 7 also closed
        // inside the band, so there is no bounce.
        let inside = [100.0, 101.0, 103.0, 103.0, 102.0, 99.0, 97.0, 99.0, 97.0];
        let rsi_now = rsi(&inside, 3)[8].unwrap();
        let bands = bollinger(&inside, 5, 1.0);
        assert!(rsi_now < RSI_OVERSOLD, "rsi {rsi_now}");
        assert!(inside[8] >= bands[8].unwrap().lower);
        assert!(inside[7] >= bands[7].unwrap().lower);

        let frame = RsiBbStrategy::new(params()).generate_signals(&series_from_closes(&inside));
        assert!(frame.entry_long.iter().all(|e| !e), "{frame:?}");

        // Same bars with only bar 7 pushed below its band: now it is a bounce.
        let mut pierced = inside;
        pierced[7] = 97.0;
        let bands = bollinger(&pierced, 5, 1.0);
        assert!(pierced[7] < bands[7].unwrap().lower);
        assert!(pierced[8] >= bands[8].unwrap().lower);

        let frame = RsiBbStrategy::new(params()).generate_signals(&series_from_closes(&pierced));
        assert!(frame.entry_long[8], "{frame:?}");
        assert_eq!(frame.entry_long.iter().filter(|e| **e).count(), 1);
    }

    #[test]
    fn cross_down_through_middle_exits() {
        let closes = [100.0, 100.0, 100.0, 100.0, 104.0, 97.0];
        let frame = RsiBbStrategy::new(params()).generate_signals(&series_from_closes(&closes));
        assert_eq!(frame.exit, vec![false, false, false, false, false, true]);
        assert!(frame.entry_short.iter().all(|e| !e));
    }
}
