//! Rolling indicators over a close series.
//!
//! Every function returns one slot per input bar. `None` marks bars where the
//! indicator is not yet defined (warmup) and must never be read as a signal.

/// Simple moving average. Defined from index `period - 1`.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut out = vec![None; n];
    if period == 0 {
        return out;
    }
    let mut sum = 0.0f64;
    for i in 0..n {
        sum += values[i];
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out[i] = Some(sum / period as f64);
        }
    }
    out
}

/// Rolling population standard deviation (ddof = 0).
pub fn rolling_std(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut out = vec![None; n];
    if period == 0 {
        return out;
    }
    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let var = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
        out[i] = Some(var.sqrt());
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BollingerPoint {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bollinger bands: rolling mean ± `num_std` population standard deviations.
pub fn bollinger(values: &[f64], period: usize, num_std: f64) -> Vec<Option<BollingerPoint>> {
    let mid = sma(values, period);
    let std = rolling_std(values, period);
    mid.into_iter()
        .zip(std)
        .map(|(m, s)| {
            let (middle, sd) = (m?, s?);
            Some(BollingerPoint {
                upper: middle + num_std * sd,
                middle,
                lower: middle - num_std * sd,
            })
        })
        .collect()
}

/// Relative strength index with Wilder smoothing.
///
/// Gains and losses go through an exponential average with `alpha = 1/period`
/// seeded on the first bar (whose change counts as zero). The value is
/// defined once `period` observations are in, i.e. from index `period - 1`.
/// A zero average loss yields 100.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = closes.len();
    let mut out = vec![None; n];
    if period == 0 || n == 0 {
        return out;
    }
    let alpha = 1.0 / period as f64;
    let mut avg_gain = 0.0f64;
    let mut avg_loss = 0.0f64;
    for i in 0..n {
        let change = if i == 0 { 0.0 } else { closes[i] - closes[i - 1] };
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        if i == 0 {
            avg_gain = gain;
            avg_loss = loss;
        } else {
            avg_gain = (1.0 - alpha) * avg_gain + alpha * gain;
            avg_loss = (1.0 - alpha) * avg_loss + alpha * loss;
        }
        if i + 1 >= period {
            out[i] = Some(if avg_loss == 0.0 {
                100.0
            } else {
                100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
            });
        }
    }
    out
}

/// Volume-weighted average price accumulated from the first bar.
///
/// Undefined while cumulative volume is still zero.
pub fn cumulative_vwap(highs: &[f64], lows: &[f64], closes: &[f64], volumes: &[f64]) -> Vec<Option<f64>> {
    let mut pv = 0.0f64;
    let mut vol = 0.0f64;
    highs
        .iter()
        .zip(lows)
        .zip(closes)
        .zip(volumes)
        .map(|(((h, l), c), v)| {
            pv += (h + l + c) / 3.0 * v;
            vol += v;
            (vol > 0.0).then(|| pv / vol)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close_to(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-9).unwrap_or(false)
    }

    #[test]
    fn sma_warmup_is_undefined() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert!(close_to(out[2], 2.0));
        assert!(close_to(out[3], 3.0));
    }

    #[test]
    fn sma_longer_than_series_is_all_none() {
        assert!(sma(&[1.0, 2.0], 5).iter().all(Option::is_none));
        assert!(sma(&[1.0, 2.0], 0).iter().all(Option::is_none));
    }

    #[test]
    fn rolling_std_is_population() {
        // values 2,4,4,4,5,5,7,9 -> population sd 2
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let out = rolling_std(&v, 8);
        assert!(close_to(out[7], 2.0));
    }

    #[test]
    fn bollinger_bands_straddle_mean() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let bb = bollinger(&v, 8, 2.0)[7].unwrap();
        assert!((bb.middle - 5.0).abs() < 1e-9);
        assert!((bb.lower - 1.0).abs() < 1e-9);
        assert!((bb.upper - 9.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_saturates_on_monotonic_moves() {
        let up: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let down: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let r_up = rsi(&up, 14);
        let r_down = rsi(&down, 14);
        assert_eq!(r_up[12], None);
        assert!(close_to(r_up[13], 100.0));
        assert!(r_down[29].unwrap() < 1e-9);
    }

    #[test]
    fn rsi_matches_hand_computed_value() {
        // period 2, alpha 0.5: changes 0,+2,-1 -> gain 0,1,0.5 ; loss 0,0,0.5
        let out = rsi(&[10.0, 12.0, 11.0], 2);
        assert_eq!(out[0], None);
        assert!(close_to(out[1], 100.0));
        assert!(close_to(out[2], 50.0));
    }

    #[test]
    fn vwap_accumulates_from_start() {
        let h = [11.0, 21.0];
        let l = [9.0, 19.0];
        let c = [10.0, 20.0];
        let v = [1.0, 3.0];
        let out = cumulative_vwap(&h, &l, &c, &v);
        assert!(close_to(out[0], 10.0));
        assert!(close_to(out[1], (10.0 + 60.0) / 4.0));
    }

    #[test]
    fn vwap_undefined_until_volume_arrives() {
        let out = cumulative_vwap(&[1.0, 1.0], &[1.0, 1.0], &[1.0, 1.0], &[0.0, 2.0]);
        assert_eq!(out[0], None);
        assert!(close_to(out[1], 1.0));
    }
}
