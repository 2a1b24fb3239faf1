//! Core domain types for the Huobi spot market-data client.
//!
//! This crate provides the types shared by every other crate:
//! - `CurrencyPair`: normalized base/quote instrument identifier
//! - `KlinePeriod`: candle granularity and its wire-token codec
//! - `Price`, `Size`: precision-safe numeric types
//! - `Depth`, `Ticker`, `Trade`, `Candle`: normalized market events

pub mod decimal;
pub mod error;
pub mod event;
pub mod pair;
pub mod period;

pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use event::{Candle, ChannelKind, Depth, DepthLevel, Ticker, Trade, TradeSide};
pub use pair::CurrencyPair;
pub use period::KlinePeriod;
