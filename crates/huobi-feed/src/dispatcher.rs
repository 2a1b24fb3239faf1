//! Event dispatch.
//!
//! [`EventHandlers`] holds at most one callback per channel kind.
//! [`EventDispatcher`] classifies an envelope, decodes its payload and
//! invokes the matching callback on the calling task. Callbacks are cloned
//! out of the registry before they run, so a callback may register other
//! handlers without deadlocking.

use crate::classifier::classify;
use crate::error::FeedResult;
use crate::payload::{DepthTick, DetailTick, KlineTick, TradeTick, WireEnvelope};
use huobi_core::{Candle, ChannelKind, Depth, KlinePeriod, Ticker, Trade};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Callback registry keyed by channel kind.
#[derive(Default)]
pub struct EventHandlers {
    depth: RwLock<Option<Callback<Depth>>>,
    ticker: RwLock<Option<Callback<Ticker>>>,
    trade: RwLock<Option<Callback<Trade>>>,
    candle: RwLock<Option<Callback<Candle>>>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the depth callback, replacing any previous one.
    pub fn on_depth<F>(&self, callback: F)
    where
        F: Fn(&Depth) + Send + Sync + 'static,
    {
        *self.depth.write() = Some(Arc::new(callback));
    }

    pub fn on_ticker<F>(&self, callback: F)
    where
        F: Fn(&Ticker) + Send + Sync + 'static,
    {
        *self.ticker.write() = Some(Arc::new(callback));
    }

    /// Invoked once per trade print.
    pub fn on_trade<F>(&self, callback: F)
    where
        F: Fn(&Trade) + Send + Sync + 'static,
    {
        *self.trade.write() = Some(Arc::new(callback));
    }

    pub fn on_candle<F>(&self, callback: F)
    where
        F: Fn(&Candle) + Send + Sync + 'static,
    {
        *self.candle.write() = Some(Arc::new(callback));
    }

    pub fn has_handler(&self, kind: ChannelKind) -> bool {
        match kind {
            ChannelKind::Depth => self.depth.read().is_some(),
            ChannelKind::Ticker => self.ticker.read().is_some(),
            ChannelKind::Trade => self.trade.read().is_some(),
            ChannelKind::Candle => self.candle.read().is_some(),
        }
    }

    fn depth_callback(&self) -> Option<Callback<Depth>> {
        self.depth.read().clone()
    }

    fn ticker_callback(&self) -> Option<Callback<Ticker>> {
        self.ticker.read().clone()
    }

    fn trade_callback(&self) -> Option<Callback<Trade>> {
        self.trade.read().clone()
    }

    fn candle_callback(&self) -> Option<Callback<Candle>> {
        self.candle.read().clone()
    }

    /// Kinds with a registered callback.
    pub fn registered(&self) -> Vec<ChannelKind> {
        ChannelKind::ALL
            .into_iter()
            .filter(|kind| self.has_handler(*kind))
            .collect()
    }
}

impl std::fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandlers")
            .field("registered", &self.registered())
            .finish()
    }
}

/// What happened to one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// `events` callbacks of `kind` were invoked.
    Delivered { kind: ChannelKind, events: usize },
    /// No classification rule matched the channel.
    Unknown,
    /// Classified, but no callback is registered for the kind.
    Unhandled(ChannelKind),
}

/// Classifies envelopes and invokes callbacks.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    handlers: Arc<EventHandlers>,
}

impl EventDispatcher {
    pub fn new(handlers: Arc<EventHandlers>) -> Self {
        Self { handlers }
    }

    pub fn handlers(&self) -> &Arc<EventHandlers> {
        &self.handlers
    }

    /// Decode `envelope` and deliver its events.
    ///
    /// Nothing is delivered when the payload fails to decode; a trade batch
    /// is decoded in full before the first print is handed out.
    pub fn dispatch(&self, envelope: &WireEnvelope) -> FeedResult<DispatchOutcome> {
        let classification = classify(&envelope.ch);
        let Some(kind) = classification.kind else {
            return Ok(DispatchOutcome::Unknown);
        };

        if !self.handlers.has_handler(kind) {
            debug!(channel = %envelope.ch, %kind, "No handler registered, ignoring");
            return Ok(DispatchOutcome::Unhandled(kind));
        }

        let timestamp = envelope.timestamp()?;
        let pair = classification.pair;

        let events = match kind {
            ChannelKind::Depth => {
                let depth = envelope.tick::<DepthTick>()?.into_event(pair, timestamp);
                if let Some(callback) = self.handlers.depth_callback() {
                    callback(&depth);
                }
                1
            }
            ChannelKind::Ticker => {
                let ticker = envelope.tick::<DetailTick>()?.into_event(pair, timestamp);
                if let Some(callback) = self.handlers.ticker_callback() {
                    callback(&ticker);
                }
                1
            }
            ChannelKind::Trade => {
                let trades = envelope
                    .tick::<TradeTick>()?
                    .into_events(&envelope.ch, &pair, timestamp)?;
                if let Some(callback) = self.handlers.trade_callback() {
                    for trade in &trades {
                        callback(trade);
                    }
                }
                trades.len()
            }
            ChannelKind::Candle => {
                let period = classification.period.unwrap_or(KlinePeriod::FALLBACK);
                let candle = envelope.tick::<KlineTick>()?.into_event(
                    &envelope.ch,
                    pair,
                    period,
                    timestamp,
                )?;
                if let Some(callback) = self.handlers.candle_callback() {
                    callback(&candle);
                }
                1
            }
        };

        trace!(channel = %envelope.ch, %kind, events, "Dispatched");
        Ok(DispatchOutcome::Delivered { kind, events })
    }

    /// Parse and dispatch a raw data frame.
    pub fn dispatch_raw(&self, raw: &str) -> FeedResult<DispatchOutcome> {
        let envelope = WireEnvelope::parse(raw)?;
        self.dispatch(&envelope)
    }
}
