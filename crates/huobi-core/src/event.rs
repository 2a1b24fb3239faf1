//! Normalized market-data events.
//!
//! Every event carries the instrument pair and the server timestamp of the
//! envelope it was decoded from. Events are built per frame and handed to
//! the caller's callback by reference.

use crate::error::CoreError;
use crate::{CurrencyPair, KlinePeriod, Price, Size};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of market channel a caller can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Incremental order book (`mbp.refresh`).
    Depth,
    /// 24h rolling summary (`detail`).
    Ticker,
    /// Individual trade prints (`trade.detail`).
    Trade,
    /// Candle aggregates (`kline`).
    Candle,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 4] = [Self::Depth, Self::Ticker, Self::Trade, Self::Candle];

    /// Client-chosen topic tag sent as `id` in subscribe frames.
    pub fn topic_tag(&self) -> &'static str {
        match self {
            Self::Depth => "spot.depth",
            Self::Ticker => "spot.ticker",
            Self::Trade => "spot.trade",
            Self::Candle => "spot.candle",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Depth => "depth",
            Self::Ticker => "ticker",
            Self::Trade => "trade",
            Self::Candle => "candle",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::UnknownChannelKind(s.to_string()))
    }
}

/// One price level of the order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Price,
    pub size: Size,
}

impl DepthLevel {
    pub fn new(price: Price, size: Size) -> Self {
        Self { price, size }
    }
}

/// Order book refresh.
///
/// Levels are kept in wire order: bids best (highest) first, asks best
/// (lowest) first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Depth {
    pub pair: CurrencyPair,
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
    /// Server timestamp of the update.
    pub timestamp: DateTime<Utc>,
}

impl Depth {
    pub fn best_bid(&self) -> Option<&DepthLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&DepthLevel> {
        self.asks.first()
    }

    /// Best ask minus best bid, if both sides are present.
    pub fn spread(&self) -> Option<Price> {
        Some(self.best_ask()?.price - self.best_bid()?.price)
    }
}

/// Rolling 24h market summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    pub pair: CurrencyPair,
    /// Last traded price (the exchange's rolling `close`).
    pub last: Price,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    /// Base-currency volume.
    pub vol: Size,
    /// Quote-currency turnover.
    pub quote_vol: Size,
    pub count: u64,
    pub timestamp: DateTime<Utc>,
}

/// Taker side of a trade print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Map the exchange `direction` field.
    pub fn from_direction(direction: &str) -> Option<Self> {
        match direction.to_ascii_lowercase().as_str() {
            "buy" => Some(Self::Buy),
            "sell" => Some(Self::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("buy"),
            Self::Sell => f.write_str("sell"),
        }
    }
}

/// Single trade print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub pair: CurrencyPair,
    pub trade_id: u64,
    pub price: Price,
    pub amount: Size,
    pub side: TradeSide,
    /// Execution time of this print.
    pub traded_at: DateTime<Utc>,
    /// Server timestamp of the envelope carrying the print.
    pub timestamp: DateTime<Utc>,
}

/// Candle aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub pair: CurrencyPair,
    pub period: KlinePeriod,
    /// Start of the candle bucket.
    pub open_time: DateTime<Utc>,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    /// Base-currency volume.
    pub volume: Size,
    /// Quote-currency turnover.
    pub quote_volume: Size,
    pub count: u64,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(px: rust_decimal::Decimal, sz: rust_decimal::Decimal) -> DepthLevel {
        DepthLevel::new(Price::new(px), Size::new(sz))
    }

    #[test]
    fn test_channel_kind_round_trip() {
        for kind in ChannelKind::ALL {
            assert_eq!(kind.as_str().parse::<ChannelKind>().unwrap(), kind);
        }
        assert!("kline".parse::<ChannelKind>().is_err());
    }

    #[test]
    fn test_topic_tags() {
        assert_eq!(ChannelKind::Depth.topic_tag(), "spot.depth");
        assert_eq!(ChannelKind::Candle.topic_tag(), "spot.candle");
    }

    #[test]
    fn test_trade_side_from_direction() {
        assert_eq!(TradeSide::from_direction("buy"), Some(TradeSide::Buy));
        assert_eq!(TradeSide::from_direction("SELL"), Some(TradeSide::Sell));
        assert_eq!(TradeSide::from_direction("hold"), None);
    }

    #[test]
    fn test_depth_spread() {
        let depth = Depth {
            pair: CurrencyPair::from_symbol("btcusdt"),
            bids: vec![level(dec!(100.5), dec!(1)), level(dec!(100.0), dec!(2))],
            asks: vec![level(dec!(101.0), dec!(1))],
            timestamp: Utc::now(),
        };
        assert_eq!(depth.best_bid().unwrap().price, Price::new(dec!(100.5)));
        assert_eq!(depth.spread(), Some(Price::new(dec!(0.5))));
    }

    #[test]
    fn test_depth_spread_one_sided() {
        let depth = Depth {
            pair: CurrencyPair::from_symbol("btcusdt"),
            bids: vec![level(dec!(100), dec!(1))],
            asks: vec![],
            timestamp: Utc::now(),
        };
        assert_eq!(depth.spread(), None);
    }
}
