//! Channel classification and event dispatch for Huobi market data.
//!
//! Turns decoded envelopes into normalized events:
//! - `classifier`: channel name → kind, pair and candle period
//! - `payload`: wire schemas of each channel's `tick`
//! - `dispatcher`: handler registry and per-kind event construction

pub mod classifier;
pub mod dispatcher;
pub mod error;
pub mod payload;

pub use classifier::{classify, ChannelRule, Classification, CHANNEL_RULES};
pub use dispatcher::{DispatchOutcome, EventDispatcher, EventHandlers};
pub use error::{FeedError, FeedResult};
pub use payload::WireEnvelope;
