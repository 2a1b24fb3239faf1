//! Wire schemas.
//!
//! Every data frame is an envelope `{"ch": ..., "ts": ..., "tick": {...}}`.
//! The shape of `tick` depends on the channel. Numbers arrive as JSON
//! numbers and are decoded straight into `Price`/`Size`. Fields not listed
//! here are ignored.

use crate::error::{FeedError, FeedResult};
use chrono::{DateTime, Utc};
use huobi_core::{
    Candle, CurrencyPair, Depth, DepthLevel, KlinePeriod, Price, Size, Ticker, Trade, TradeSide,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Outer wrapper of every data frame.
#[derive(Debug, Clone, Deserialize)]
pub struct WireEnvelope {
    pub ch: String,
    /// Server time in milliseconds.
    pub ts: i64,
    #[serde(default)]
    pub tick: Value,
}

impl WireEnvelope {
    pub fn parse(raw: &str) -> FeedResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn timestamp(&self) -> FeedResult<DateTime<Utc>> {
        millis_to_datetime(self.ts).ok_or_else(|| {
            FeedError::invalid(&self.ch, format!("timestamp out of range: {}", self.ts))
        })
    }

    /// Decode `tick` into a channel schema.
    pub fn tick<T: DeserializeOwned>(&self) -> FeedResult<T> {
        T::deserialize(&self.tick).map_err(|e| FeedError::invalid(&self.ch, e.to_string()))
    }
}

pub fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

/// `mbp.refresh` / `depth.step` tick: `[[price, size], ...]` per side.
#[derive(Debug, Deserialize)]
pub struct DepthTick {
    #[serde(default)]
    pub bids: Vec<(Price, Size)>,
    #[serde(default)]
    pub asks: Vec<(Price, Size)>,
}

impl DepthTick {
    pub fn into_event(self, pair: CurrencyPair, timestamp: DateTime<Utc>) -> Depth {
        let levels = |side: Vec<(Price, Size)>| {
            side.into_iter()
                .map(|(price, size)| DepthLevel::new(price, size))
                .collect()
        };
        Depth {
            pair,
            bids: levels(self.bids),
            asks: levels(self.asks),
            timestamp,
        }
    }
}

/// `detail` tick (rolling 24h summary).
#[derive(Debug, Deserialize)]
pub struct DetailTick {
    pub open: Price,
    pub close: Price,
    pub high: Price,
    pub low: Price,
    /// Base-currency volume.
    #[serde(default)]
    pub amount: Size,
    /// Quote-currency turnover.
    #[serde(default)]
    pub vol: Size,
    #[serde(default)]
    pub count: u64,
}

impl DetailTick {
    pub fn into_event(self, pair: CurrencyPair, timestamp: DateTime<Utc>) -> Ticker {
        Ticker {
            pair,
            last: self.close,
            open: self.open,
            high: self.high,
            low: self.low,
            vol: self.amount,
            quote_vol: self.vol,
            count: self.count,
            timestamp,
        }
    }
}

/// `trade.detail` tick: a batch of prints.
#[derive(Debug, Deserialize)]
pub struct TradeTick {
    #[serde(default)]
    pub data: Vec<TradePrint>,
}

#[derive(Debug, Deserialize)]
pub struct TradePrint {
    #[serde(rename = "tradeId")]
    pub trade_id: u64,
    pub amount: Size,
    pub price: Price,
    pub direction: String,
    /// Execution time in milliseconds.
    pub ts: i64,
}

impl TradeTick {
    /// One event per print, in payload order.
    pub fn into_events(
        self,
        channel: &str,
        pair: &CurrencyPair,
        timestamp: DateTime<Utc>,
    ) -> FeedResult<Vec<Trade>> {
        self.data
            .into_iter()
            .map(|print| {
                let side = TradeSide::from_direction(&print.direction).ok_or_else(|| {
                    FeedError::invalid(channel, format!("unknown direction: {}", print.direction))
                })?;
                let traded_at = millis_to_datetime(print.ts).ok_or_else(|| {
                    FeedError::invalid(channel, format!("trade ts out of range: {}", print.ts))
                })?;
                Ok(Trade {
                    pair: pair.clone(),
                    trade_id: print.trade_id,
                    price: print.price,
                    amount: print.amount,
                    side,
                    traded_at,
                    timestamp,
                })
            })
            .collect()
    }
}

/// `kline` tick.
#[derive(Debug, Deserialize)]
pub struct KlineTick {
    /// Bucket open time in seconds.
    pub id: i64,
    pub open: Price,
    pub close: Price,
    pub low: Price,
    pub high: Price,
    /// Base-currency volume.
    #[serde(default)]
    pub amount: Size,
    /// Quote-currency turnover.
    #[serde(default)]
    pub vol: Size,
    #[serde(default)]
    pub count: u64,
}

impl KlineTick {
    pub fn into_event(
        self,
        channel: &str,
        pair: CurrencyPair,
        period: KlinePeriod,
        timestamp: DateTime<Utc>,
    ) -> FeedResult<Candle> {
        let open_time = DateTime::from_timestamp(self.id, 0).ok_or_else(|| {
            FeedError::invalid(channel, format!("candle id out of range: {}", self.id))
        })?;
        Ok(Candle {
            pair,
            period,
            open_time,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.amount,
            quote_volume: self.vol,
            count: self.count,
            timestamp,
        })
    }
}
