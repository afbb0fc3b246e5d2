use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::types::{Frequency, PairId, PriceBar};

/// Time window and bar size requested from a provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub frequency: Frequency,
    /// Maximum bars per request. Longer windows are truncated, not paginated.
    pub limit: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairInfo {
    pub pair: PairId,
    pub base: String,
    pub quote: String,
    pub spot: bool,
    pub tradeable: bool,
}

/// The store's only contract with the outside world.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Markets quoted in `quote`, in provider order.
    async fn list_spot_pairs(&self, quote: &str) -> Result<Vec<PairInfo>, DataError>;

    async fn fetch_ohlcv(&self, pair: &PairId, window: &DataWindow) -> Result<Vec<PriceBar>, DataError>;
}
