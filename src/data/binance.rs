//! Binance spot REST client for the market-data boundary.
//!
//! One unpaginated `klines` request per pair; see [`DataWindow::limit`].

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::data::provider::{DataWindow, MarketDataProvider, PairInfo};
use crate::error::DataError;
use crate::types::{PairId, PriceBar};

/// Exchange cap on bars per `klines` request.
pub const MAX_KLINES_PER_REQUEST: usize = 1_000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    status: String,
    base_asset: String,
    quote_asset: String,
    #[serde(default)]
    is_spot_trading_allowed: bool,
}

pub struct BinanceProvider {
    http: Client,
    base: Url,
}

impl BinanceProvider {
    pub fn new(api_base: &str) -> Result<Self, DataError> {
        let mut base =
            Url::parse(api_base).map_err(|e| DataError::Provider(format!("invalid api base {api_base}: {e}")))?;
        // Endpoints are joined relative to the base, so its path must end in a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, DataError> {
        self.base
            .join(path)
            .map_err(|e| DataError::Provider(format!("invalid endpoint {path}: {e}")))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, DataError> {
        let resp = self.http.get(url.clone()).query(query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DataError::Provider(format!("{url} returned {status}: {body}")));
        }
        Ok(resp.json::<T>().await?)
    }
}

/// `ETH/BTC` -> `ETHBTC`.
pub fn exchange_symbol(pair: &PairId) -> String {
    pair.0.replace('/', "")
}

fn pairs_from_exchange_info(info: ExchangeInfo, quote: &str) -> Vec<PairInfo> {
    info.symbols
        .into_iter()
        .filter(|s| s.quote_asset == quote)
        .map(|s| PairInfo {
            pair: PairId(format!("{}/{}", s.base_asset, s.quote_asset)),
            base: s.base_asset,
            quote: s.quote_asset,
            spot: s.is_spot_trading_allowed,
            tradeable: s.status == "TRADING",
        })
        .collect()
}

fn field_f64(row: &[serde_json::Value], idx: usize, name: &str) -> Result<f64, DataError> {
    let v = row
        .get(idx)
        .ok_or_else(|| DataError::Malformed(format!("kline row missing {name}")))?;
    match v {
        serde_json::Value::String(s) => s
            .parse()
            .map_err(|_| DataError::Malformed(format!("kline {name} not numeric: {s}"))),
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| DataError::Malformed(format!("kline {name} out of range"))),
        other => Err(DataError::Malformed(format!("kline {name} has type {other}"))),
    }
}

/// Kline row layout: `[open_time_ms, open, high, low, close, volume, close_time_ms, ...]`.
pub fn parse_kline(pair: &PairId, row: &[serde_json::Value]) -> Result<PriceBar, DataError> {
    let open_ms = row
        .first()
        .and_then(|v| v.as_i64())
        .ok_or_else(|| DataError::Malformed("kline row missing open time".into()))?;
    let timestamp = Utc
        .timestamp_millis_opt(open_ms)
        .single()
        .ok_or_else(|| DataError::Malformed(format!("kline open time {open_ms} out of range")))?;
    Ok(PriceBar {
        timestamp,
        open: field_f64(row, 1, "open")?,
        high: field_f64(row, 2, "high")?,
        low: field_f64(row, 3, "low")?,
        close: field_f64(row, 4, "close")?,
        volume: field_f64(row, 5, "volume")?,
        pair: pair.clone(),
    })
}

#[async_trait]
impl MarketDataProvider for BinanceProvider {
    async fn list_spot_pairs(&self, quote: &str) -> Result<Vec<PairInfo>, DataError> {
        let url = self.endpoint("api/v3/exchangeInfo")?;
        let info: ExchangeInfo = self.get_json(url, &[]).await?;
        Ok(pairs_from_exchange_info(info, quote))
    }

    async fn fetch_ohlcv(&self, pair: &PairId, window: &DataWindow) -> Result<Vec<PriceBar>, DataError> {
        let url = self.endpoint("api/v3/klines")?;
        let limit = window.limit.clamp(1, MAX_KLINES_PER_REQUEST);
        let query = [
            ("symbol", exchange_symbol(pair)),
            ("interval", window.frequency.as_interval().to_string()),
            ("startTime", window.start.timestamp_millis().to_string()),
            ("endTime", window.end.timestamp_millis().to_string()),
            ("limit", limit.to_string()),
        ];
        let rows: Vec<Vec<serde_json::Value>> = self.get_json(url, &query).await?;
        if rows.len() == limit {
            tracing::warn!(%pair, limit, "kline request hit the result limit; window may be truncated");
        }
        rows.iter().map(|row| parse_kline(pair, row)).collect()
    }
}
