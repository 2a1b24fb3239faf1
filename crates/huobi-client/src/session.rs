//! Client session.
//!
//! [`SpotWs`] is the public entry point: register callbacks, then call the
//! `subscribe_*` methods. The first subscribe opens the connection; later
//! ones reuse it. Every subscription is recorded and replayed, in issue
//! order, after each reconnect.

use crate::error::{ClientError, ClientResult};
use crate::router::FrameRouter;
use huobi_core::{Candle, CurrencyPair, Depth, KlinePeriod, Ticker, Trade};
use huobi_feed::EventHandlers;
use huobi_ws::{
    ConnectionConfig, ConnectionManager, ConnectionState, Subscription, SubscriptionRegistry,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection task yet.
    Unconnected,
    /// Connection task running, handshake pending or reconnecting.
    Connecting,
    /// Socket open.
    Connected,
    /// Shut down, or the connection task gave up reconnecting. The client
    /// cannot be reused.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unconnected => "unconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

struct Inner {
    handlers: Arc<EventHandlers>,
    registry: Arc<SubscriptionRegistry>,
    manager: Arc<ConnectionManager>,
    /// Only ever holds `Unconnected`, `Connecting` or `Closed`; the
    /// connected/connecting split is read from the connection manager.
    state: Mutex<SessionState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.manager.shutdown();
    }
}

/// Huobi spot market-data client.
///
/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct SpotWs {
    inner: Arc<Inner>,
}

impl Default for SpotWs {
    fn default() -> Self {
        Self::new()
    }
}

impl SpotWs {
    /// Client for the default endpoint.
    pub fn new() -> Self {
        Self::with_config(ConnectionConfig::default())
    }

    pub fn with_config(config: ConnectionConfig) -> Self {
        let handlers = Arc::new(EventHandlers::new());
        let registry = Arc::new(SubscriptionRegistry::new());
        let router = Arc::new(FrameRouter::new(handlers.clone()));
        let manager = Arc::new(ConnectionManager::new(config, registry.clone(), router));

        Self {
            inner: Arc::new(Inner {
                handlers,
                registry,
                manager,
                state: Mutex::new(SessionState::Unconnected),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn on_depth<F>(&self, callback: F)
    where
        F: Fn(&Depth) + Send + Sync + 'static,
    {
        self.inner.handlers.on_depth(callback);
    }

    pub fn on_ticker<F>(&self, callback: F)
    where
        F: Fn(&Ticker) + Send + Sync + 'static,
    {
        self.inner.handlers.on_ticker(callback);
    }

    /// Called once per trade print.
    pub fn on_trade<F>(&self, callback: F)
    where
        F: Fn(&Trade) + Send + Sync + 'static,
    {
        self.inner.handlers.on_trade(callback);
    }

    pub fn on_candle<F>(&self, callback: F)
    where
        F: Fn(&Candle) + Send + Sync + 'static,
    {
        self.inner.handlers.on_candle(callback);
    }

    pub fn handlers(&self) -> &Arc<EventHandlers> {
        &self.inner.handlers
    }

    pub fn subscribe_depth(&self, pair: CurrencyPair) -> ClientResult<()> {
        self.subscribe(Subscription::depth(pair))
    }

    pub fn subscribe_ticker(&self, pair: CurrencyPair) -> ClientResult<()> {
        self.subscribe(Subscription::ticker(pair))
    }

    pub fn subscribe_trade(&self, pair: CurrencyPair) -> ClientResult<()> {
        self.subscribe(Subscription::trade(pair))
    }

    pub fn subscribe_candle(&self, pair: CurrencyPair, period: KlinePeriod) -> ClientResult<()> {
        self.subscribe(Subscription::candle(pair, period))
    }

    /// Record a subscription and make sure it reaches the server.
    ///
    /// Fails without recording anything or touching the network when no
    /// callback is registered for the subscription's kind.
    pub fn subscribe(&self, subscription: Subscription) -> ClientResult<()> {
        if !self.inner.handlers.has_handler(subscription.kind) {
            return Err(ClientError::MissingCallback(subscription.kind));
        }

        self.connect()?;

        info!(channel = %subscription, "Subscribing");
        self.inner.registry.add(subscription);
        self.inner.manager.notify_subscriptions();
        Ok(())
    }

    /// Start the connection task if it is not running yet.
    ///
    /// Idempotent and safe to call concurrently: exactly one task is ever
    /// spawned. Returns without waiting for the handshake.
    pub fn connect(&self) -> ClientResult<()> {
        let mut state = self.inner.state.lock();
        match *state {
            SessionState::Unconnected => {}
            SessionState::Closed => return Err(ClientError::Closed),
            SessionState::Connecting | SessionState::Connected => return Ok(()),
        }

        let runtime = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;
        let manager = self.inner.manager.clone();
        let session: Weak<Inner> = Arc::downgrade(&self.inner);
        let task = runtime.spawn(async move {
            if let Err(e) = manager.connect().await {
                error!(error = %e, "Connection task stopped");
            }
            // No socket will carry later subscriptions; refuse them.
            if let Some(inner) = session.upgrade() {
                *inner.state.lock() = SessionState::Closed;
            }
        });

        *self.inner.task.lock() = Some(task);
        *state = SessionState::Connecting;
        info!("Connection task started");
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        let state = *self.inner.state.lock();
        match state {
            SessionState::Unconnected | SessionState::Closed => state,
            SessionState::Connecting | SessionState::Connected => {
                match self.inner.manager.state() {
                    ConnectionState::Connected => SessionState::Connected,
                    _ => SessionState::Connecting,
                }
            }
        }
    }

    /// Every subscription issued so far, in issue order.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.inner.registry.snapshot()
    }

    /// Successful handshakes so far (1 + reconnects).
    pub fn connection_count(&self) -> u64 {
        self.inner.manager.connection_count()
    }

    /// Stop the connection task. A Close frame is sent if connected.
    ///
    /// Also reached on its own once the connection task exhausts
    /// `max_reconnect_attempts`.
    pub fn shutdown(&self) {
        *self.inner.state.lock() = SessionState::Closed;
        self.inner.manager.shutdown();
    }

    /// [`Self::shutdown`], then wait for the connection task to finish.
    pub async fn close(&self) {
        self.shutdown();
        let task = self.inner.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "Connection task panicked");
            }
        }
    }
}

impl fmt::Debug for SpotWs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotWs")
            .field("state", &self.state())
            .field("subscriptions", &self.inner.registry.len())
            .field("handlers", &self.inner.handlers)
            .finish()
    }
}
