use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DataError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairId(pub String);

impl std::fmt::Display for PairId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StrategyName(pub String);

impl std::fmt::Display for StrategyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bar size. Serialized with the exchange interval codes ("1m", "1h", ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Day1,
}

impl Frequency {
    pub fn as_interval(self) -> &'static str {
        match self {
            Frequency::Minute1 => "1m",
            Frequency::Minute5 => "5m",
            Frequency::Minute15 => "15m",
            Frequency::Hour1 => "1h",
            Frequency::Hour4 => "4h",
            Frequency::Day1 => "1d",
        }
    }

    pub fn seconds(self) -> i64 {
        match self {
            Frequency::Minute1 => 60,
            Frequency::Minute5 => 300,
            Frequency::Minute15 => 900,
            Frequency::Hour1 => 3_600,
            Frequency::Hour4 => 14_400,
            Frequency::Day1 => 86_400,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::seconds(self.seconds())
    }

    /// Bars per 365-day year, used to annualize per-bar returns.
    pub fn bars_per_year(self) -> f64 {
        365.0 * 86_400.0 / self.seconds() as f64
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Frequency::Minute1),
            "5m" => Ok(Frequency::Minute5),
            "15m" => Ok(Frequency::Minute15),
            "1h" => Ok(Frequency::Hour1),
            "4h" => Ok(Frequency::Hour4),
            "1d" => Ok(Frequency::Day1),
            other => Err(format!("unsupported bar frequency: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub pair: PairId,
}

impl PriceBar {
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    fn is_complete(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Time-ordered OHLCV bars, possibly covering several pairs back to back.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceBarSeries {
    bars: Vec<PriceBar>,
}

impl PriceBarSeries {
    pub fn new(bars: Vec<PriceBar>) -> Self {
        Self { bars }
    }

    /// Build a series and reject it unless it passes [`PriceBarSeries::validate`].
    pub fn try_new(bars: Vec<PriceBar>) -> Result<Self, DataError> {
        let series = Self::new(bars);
        series.validate()?;
        Ok(series)
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn into_bars(self) -> Vec<PriceBar> {
        self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Every OHLCV field is finite and timestamps strictly increase within each pair.
    pub fn validate(&self) -> Result<(), DataError> {
        let mut last_seen: std::collections::HashMap<&PairId, DateTime<Utc>> =
            std::collections::HashMap::new();
        for (idx, bar) in self.bars.iter().enumerate() {
            if !bar.is_complete() {
                return Err(DataError::MissingValue {
                    pair: bar.pair.clone(),
                    index: idx,
                });
            }
            if let Some(prev) = last_seen.insert(&bar.pair, bar.timestamp) {
                if bar.timestamp <= prev {
                    return Err(DataError::NonMonotonic {
                        pair: bar.pair.clone(),
                        index: idx,
                    });
                }
            }
        }
        Ok(())
    }

    /// Pairs in order of first appearance.
    pub fn pairs(&self) -> Vec<PairId> {
        let mut out: Vec<PairId> = Vec::new();
        for bar in &self.bars {
            if !out.contains(&bar.pair) {
                out.push(bar.pair.clone());
            }
        }
        out
    }

    pub fn for_pair(&self, pair: &PairId) -> PriceBarSeries {
        Self::new(
            self.bars
                .iter()
                .filter(|b| &b.pair == pair)
                .cloned()
                .collect(),
        )
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }
}
