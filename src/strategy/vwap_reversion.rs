//! Intraday VWAP reversion.
//!
//! The VWAP accumulates from the first bar of the series rather than over a
//! rolling window, so it is noisy early on and settles as volume builds up.
//! Long when price sits more than `threshold` below it, short when more than
//! `threshold` above, and flat again once price is back within
//! `exit_tolerance` of it.

use serde::{Deserialize, Serialize};

use crate::indicators::cumulative_vwap;
use crate::strategy::{SignalFrame, Strategy, TradeDirection};
use crate::types::PriceBarSeries;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VwapReversionParams {
    /// Fractional deviation from VWAP that opens a position (0.01 = 1%).
    pub threshold: f64,
    /// Fractional deviation under which any position is closed.
    pub exit_tolerance: f64,
}

impl Default for VwapReversionParams {
    fn default() -> Self {
        Self {
            threshold: 0.01,
            exit_tolerance: 0.001,
        }
    }
}

#[derive(Clone, Debug)]
pub struct VwapReversionStrategy {
    name: String,
    params: VwapReversionParams,
}

impl VwapReversionStrategy {
    pub fn new(params: VwapReversionParams) -> Self {
        Self::named("VWAP_Reversion", params)
    }

    pub fn named(name: impl Into<String>, params: VwapReversionParams) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Per-bar `(close - vwap) / vwap`; `None` while the VWAP is undefined.
    pub fn deviations(series: &PriceBarSeries) -> Vec<Option<f64>> {
        let closes = series.closes();
        let vwap = cumulative_vwap(&series.highs(), &series.lows(), &closes, &series.volumes());
        closes
            .iter()
            .zip(vwap)
            .map(|(c, v)| v.filter(|v| *v != 0.0).map(|v| (c - v) / v))
            .collect()
    }
}

impl Strategy for VwapReversionStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn direction(&self) -> TradeDirection {
        TradeDirection::Both
    }

    fn generate_signals(&self, series: &PriceBarSeries) -> SignalFrame {
        let dev = Self::deviations(series);
        let mut frame = SignalFrame::neutral(dev.len());
        for (i, d) in dev.into_iter().enumerate() {
            let Some(d) = d else { continue };
            frame.entry_long[i] = d < -self.params.threshold;
            frame.entry_short[i] = d > self.params.threshold;
            frame.exit[i] = d.abs() < self.params.exit_tolerance;
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PairId, PriceBar};
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn bars(ohlcv: &[(f64, f64, f64, f64)]) -> PriceBarSeries {
        PriceBarSeries::new(
            ohlcv
                .iter()
                .enumerate()
                .map(|(i, &(h, l, c, v))| PriceBar {
                    timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 60, 0).unwrap(),
                    open: c,
                    high: h,
                    low: l,
                    close: c,
                    volume: v,
                    pair: PairId("ETH/BTC".into()),
                })
                .collect(),
        )
    }

    fn variance(xs: &[f64]) -> f64 {
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / xs.len() as f64
    }

    #[test]
    fn close_on_vwap_exits_and_never_enters() {
        // high == low == close makes typical price equal close, so VWAP tracks a flat price exactly.
        let series = bars(&[(50.0, 50.0, 50.0, 10.0); 8]);
        let frame = VwapReversionStrategy::new(VwapReversionParams::default()).generate_signals(&series);
        assert!(frame.exit.iter().all(|e| *e));
        assert!(frame.entry_long.iter().all(|e| !e));
        assert!(frame.entry_short.iter().all(|e| !e));
    }

    #[test]
    fn deviation_sign_picks_direction() {
        let series = bars(&[
            (100.0, 100.0, 100.0, 1_000.0),
            (98.0, 96.0, 97.0, 1.0),
            (104.0, 102.0, 103.0, 1.0),
        ]);
        let frame = VwapReversionStrategy::new(VwapReversionParams::default()).generate_signals(&series);
        assert!(frame.exit[0]);
        assert!(frame.entry_long[1] && !frame.entry_short[1]);
        assert!(frame.entry_short[2] && !frame.entry_long[2]);
    }

    #[test]
    fn zero_volume_prefix_is_neutral() {
        let series = bars(&[(10.0, 10.0, 10.0, 0.0), (10.0, 10.0, 10.0, 5.0)]);
        let frame = VwapReversionStrategy::new(VwapReversionParams::default()).generate_signals(&series);
        assert!(!frame.exit[0] && !frame.entry_long[0] && !frame.entry_short[0]);
        assert!(frame.exit[1]);
    }

    #[test]
    fn vwap_settles_as_series_grows() {
        // Close oscillates around 100 with noise; bar ranges are symmetric around close.
        let mut rng = StdRng::seed_from_u64(7);
        let ohlcv: Vec<(f64, f64, f64, f64)> = (0..4_000)
            .map(|i| {
                let c = 100.0 + 2.0 * (i as f64 * 0.3).sin() + rng.gen_range(-0.5..0.5);
                (c + 0.5, c - 0.5, c, rng.gen_range(50.0..150.0))
            })
            .collect();
        let series = bars(&ohlcv);

        // Recover the VWAP each deviation was measured against.
        let implied_vwap: Vec<f64> = VwapReversionStrategy::deviations(&series)
            .into_iter()
            .zip(&ohlcv)
            .map(|(d, bar)| bar.2 / (1.0 + d.unwrap()))
            .collect();

        let early = variance(&implied_vwap[1..50]);
        let late = variance(&implied_vwap[3_950..]);
        assert!(late < early / 100.0, "early={early} late={late}");
    }
}
