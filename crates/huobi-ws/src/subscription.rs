//! Subscription registry.
//!
//! Records every subscribe request issued on the client so the session can
//! be rebuilt after a reconnect. The registry is append-only: entries are
//! never mutated or removed, and their order is the order they were issued.
//!
//! The connection task keeps a per-connection send cursor into the registry.
//! On a fresh connection the cursor starts at zero, so every entry is
//! replayed in order; afterwards only entries past the cursor are sent. This
//! keeps subscribe frames unique per connection even when a subscribe races
//! with the initial connect.

use crate::message::SubscribeRequest;
use huobi_core::{ChannelKind, CurrencyPair, KlinePeriod};
use parking_lot::RwLock;
use std::fmt;
use tracing::debug;

/// Depth levels requested on the `mbp.refresh` channel.
pub const DEPTH_LEVELS: u32 = 20;

/// A single subscribe request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub kind: ChannelKind,
    pub pair: CurrencyPair,
    /// Only set for candle subscriptions.
    pub period: Option<KlinePeriod>,
}

impl Subscription {
    pub fn depth(pair: CurrencyPair) -> Self {
        Self {
            kind: ChannelKind::Depth,
            pair,
            period: None,
        }
    }

    pub fn ticker(pair: CurrencyPair) -> Self {
        Self {
            kind: ChannelKind::Ticker,
            pair,
            period: None,
        }
    }

    pub fn trade(pair: CurrencyPair) -> Self {
        Self {
            kind: ChannelKind::Trade,
            pair,
            period: None,
        }
    }

    pub fn candle(pair: CurrencyPair, period: KlinePeriod) -> Self {
        Self {
            kind: ChannelKind::Candle,
            pair,
            period: Some(period),
        }
    }

    /// Channel name (`sub` field of the control frame).
    pub fn channel(&self) -> String {
        let symbol = self.pair.symbol();
        match self.kind {
            ChannelKind::Depth => format!("market.{symbol}.mbp.refresh.{DEPTH_LEVELS}"),
            ChannelKind::Ticker => format!("market.{symbol}.detail"),
            ChannelKind::Trade => format!("market.{symbol}.trade.detail"),
            ChannelKind::Candle => format!(
                "market.{symbol}.kline.{}",
                self.period.unwrap_or(KlinePeriod::FALLBACK).token()
            ),
        }
    }

    /// Subscribe control frame for this subscription.
    pub fn request(&self) -> SubscribeRequest {
        SubscribeRequest::new(self.kind.topic_tag(), self.channel())
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.channel())
    }
}

/// Append-only, ordered record of issued subscriptions.
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: RwLock<Vec<Subscription>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscription. Returns its position in issue order.
    pub fn add(&self, subscription: Subscription) -> usize {
        let mut entries = self.entries.write();
        entries.push(subscription);
        let index = entries.len() - 1;
        debug!(index, channel = %entries[index], "Subscription recorded");
        index
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Snapshot of every subscription in issue order.
    pub fn snapshot(&self) -> Vec<Subscription> {
        self.entries.read().clone()
    }

    /// Entries issued at or after `cursor`, in issue order.
    pub fn pending_from(&self, cursor: usize) -> Vec<Subscription> {
        self.entries
            .read()
            .get(cursor..)
            .map(<[Subscription]>::to_vec)
            .unwrap_or_default()
    }
}
