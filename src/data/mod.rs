//! Price data store: cached Parquet bars, refetched from a provider when the
//! cache is absent or dirty.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::types::{PairId, PriceBarSeries};

pub mod binance;
pub mod cache;
pub mod provider;

pub use binance::BinanceProvider;
pub use cache::{read_cache, write_cache, CacheState};
pub use provider::{DataWindow, MarketDataProvider, PairInfo};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    /// Quote asset the pairs are priced in, e.g. "BTC".
    pub quote_asset: String,
    /// Keep the first N tradeable pairs, in provider order.
    pub top_n: usize,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            quote_asset: "BTC".to_string(),
            top_n: 100,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetSource {
    Cache,
    Provider,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DatasetOutcome {
    Loaded {
        series: PriceBarSeries,
        source: DatasetSource,
    },
    /// The universe had no pairs, or none of them returned bars.
    Empty,
}

impl DatasetOutcome {
    pub fn into_series(self) -> Option<PriceBarSeries> {
        match self {
            DatasetOutcome::Loaded { series, .. } => Some(series),
            DatasetOutcome::Empty => None,
        }
    }
}

pub struct PriceDataStore<P> {
    provider: P,
    cache_path: PathBuf,
    universe: UniverseConfig,
}

impl<P: MarketDataProvider> PriceDataStore<P> {
    pub fn new(provider: P, cache_path: impl Into<PathBuf>, universe: UniverseConfig) -> Self {
        Self {
            provider,
            cache_path: cache_path.into(),
            universe,
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Cached dataset if present and complete, otherwise a fresh fetch of the
    /// whole universe (which then replaces the cache).
    pub async fn load_or_fetch(&self, window: &DataWindow) -> Result<DatasetOutcome, DataError> {
        if let Some(series) = load_clean_cache(&self.cache_path) {
            tracing::info!(path = %self.cache_path.display(), rows = series.len(), "using cached bars");
            return Ok(DatasetOutcome::Loaded {
                series,
                source: DatasetSource::Cache,
            });
        }

        let pairs = self.select_universe().await?;
        if pairs.is_empty() {
            tracing::warn!(quote = %self.universe.quote_asset, "no tradeable pairs found");
            return Ok(DatasetOutcome::Empty);
        }

        let mut bars = Vec::new();
        for pair in &pairs {
            let fetched = self.provider.fetch_ohlcv(pair, window).await?;
            tracing::debug!(%pair, bars = fetched.len(), "fetched bars");
            bars.extend(fetched);
        }
        if bars.is_empty() {
            tracing::warn!(pairs = pairs.len(), "provider returned no bars for the window");
            return Ok(DatasetOutcome::Empty);
        }

        let series = PriceBarSeries::try_new(bars)?;
        write_cache(&self.cache_path, &series)?;
        Ok(DatasetOutcome::Loaded {
            series,
            source: DatasetSource::Provider,
        })
    }

    /// First `top_n` tradeable spot pairs quoted in the configured asset.
    pub async fn select_universe(&self) -> Result<Vec<PairId>, DataError> {
        let listed = self.provider.list_spot_pairs(&self.universe.quote_asset).await?;
        Ok(listed
            .into_iter()
            .filter(|p| p.quote == self.universe.quote_asset && p.spot && p.tradeable)
            .take(self.universe.top_n)
            .map(|p| p.pair)
            .collect())
    }
}

/// Cache contents if the file exists, has no nulls and passes validation.
///
/// Unreadable or invalid caches are logged and treated as absent.
pub fn load_clean_cache(path: &Path) -> Option<PriceBarSeries> {
    match read_cache(path) {
        Ok(CacheState::Clean(series)) => match series.validate() {
            Ok(()) => Some(series),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cached bars invalid; refetching");
                None
            }
        },
        Ok(CacheState::Dirty { nulls }) => {
            tracing::warn!(path = %path.display(), nulls, "cached bars contain nulls; refetching");
            None
        }
        Ok(CacheState::Missing) => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cached bars unreadable; refetching");
            None
        }
    }
}
