//! WebSocket connection manager.
//!
//! Owns the single socket of a client. Handles connection lifecycle,
//! automatic reconnection with exponential backoff, subscription replay
//! after reconnection, inline heartbeat replies, and hands every other
//! frame to a [`FrameHandler`] on the connection task.

use crate::codec::GzipDecoder;
use crate::error::{WsError, WsResult};
use crate::heartbeat::{HeartbeatResponder, IdleMonitor};
use crate::subscription::SubscriptionRegistry;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use huobi_telemetry::Metrics;
use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio_tungstenite::{
    connect_async_tls_with_config, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default market-data endpoint.
pub const DEFAULT_URL: &str = "wss://api.huobi.pro/ws";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Receives every non-heartbeat frame, in wire order, on the connection task.
#[cfg_attr(test, mockall::automock)]
pub trait FrameHandler: Send + Sync + 'static {
    /// Handle one decoded frame. Must not block.
    fn on_frame(&self, frame: &str);

    /// Called after a (re)connect once `replayed` subscriptions were sent.
    fn on_connected(&self, _replayed: usize) {}
}

/// Connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// WebSocket URL.
    #[serde(default = "default_url")]
    pub url: String,
    /// Consecutive failed reconnection attempts tolerated before giving up
    /// (0 = infinite). Every successful handshake resets the count.
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Reconnect if no frame arrives for this long.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// Add up to 1s of random jitter to backoff delays.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60000
}

fn default_idle_timeout_ms() -> u64 {
    30000
}

fn default_jitter() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_reconnect_attempts: 0, // Infinite
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            jitter: default_jitter(),
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

/// What the read loop does with one inbound frame.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FrameAction {
    /// Heartbeat probe: send this reply, route nothing.
    Reply(Vec<u8>),
    /// Delivered to the frame handler.
    Routed,
    /// Not valid UTF-8; logged and dropped.
    Dropped,
}

/// Heartbeat first, then the handler. Never both.
pub(crate) fn route_frame(
    responder: &HeartbeatResponder,
    handler: &dyn FrameHandler,
    frame: &[u8],
) -> FrameAction {
    if let Some(reply) = responder.respond(frame) {
        return FrameAction::Reply(reply);
    }

    match std::str::from_utf8(frame) {
        Ok(text) => {
            handler.on_frame(text);
            FrameAction::Routed
        }
        Err(e) => {
            warn!(error = %e, len = frame.len(), "Dropping non-UTF-8 frame");
            Metrics::decode_error("utf8");
            FrameAction::Dropped
        }
    }
}

/// WebSocket connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    state: Arc<RwLock<ConnectionState>>,
    registry: Arc<SubscriptionRegistry>,
    handler: Arc<dyn FrameHandler>,
    decoder: GzipDecoder,
    responder: HeartbeatResponder,
    idle: IdleMonitor,
    reconnect_count: Arc<RwLock<u32>>,
    /// Number of successful handshakes over the manager's lifetime.
    connections: AtomicU64,
    /// Wakes the message loop when new subscriptions were recorded.
    subscribe_notify: Notify,
    /// Cancellation token for graceful shutdown.
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new(
        config: ConnectionConfig,
        registry: Arc<SubscriptionRegistry>,
        handler: Arc<dyn FrameHandler>,
    ) -> Self {
        let idle = IdleMonitor::new(config.idle_timeout_ms);
        Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            registry,
            handler,
            decoder: GzipDecoder::new(),
            responder: HeartbeatResponder::new(),
            idle,
            reconnect_count: Arc::new(RwLock::new(0)),
            connections: AtomicU64::new(0),
            subscribe_notify: Notify::new(),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Number of successful handshakes so far.
    pub fn connection_count(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u32 {
        *self.reconnect_count.read()
    }

    /// Wake the message loop to send subscriptions recorded since the last flush.
    ///
    /// Safe to call before the connection exists; the wake-up is kept and
    /// the replay on connect already covers the new entries.
    pub fn notify_subscriptions(&self) {
        self.subscribe_notify.notify_one();
    }

    /// Signal graceful shutdown.
    pub fn shutdown(&self) {
        info!("ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        Metrics::ws_state_set(state.as_str());
    }

    /// Connect and run the message loop, reconnecting until shutdown or
    /// until `max_reconnect_attempts` consecutive attempts have failed.
    pub async fn connect(&self) -> WsResult<()> {
        // Attempts since the last successful handshake.
        let mut attempt = 0u32;

        loop {
            if self.is_shutdown() {
                info!("Shutdown requested, exiting connect loop");
                self.set_state(ConnectionState::Disconnected);
                return Ok(());
            }

            if attempt == 0 {
                self.set_state(ConnectionState::Connecting);
            }

            let reason = match self.try_connect().await {
                Ok(stream) => {
                    attempt = 0;
                    let reason = match self.run_session(stream).await {
                        Ok(()) => {
                            info!("WebSocket connection closed");
                            "eof"
                        }
                        Err(e) => {
                            error!(error = %e, "WebSocket connection error");
                            reconnect_reason(&e)
                        }
                    };
                    Metrics::ws_disconnected();
                    reason
                }
                Err(e) => {
                    error!(error = %e, attempt, "WebSocket connection attempt failed");
                    reconnect_reason(&e)
                }
            };

            if self.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                self.set_state(ConnectionState::Disconnected);
                return Ok(());
            }

            attempt += 1;
            *self.reconnect_count.write() = attempt;

            if self.config.max_reconnect_attempts > 0
                && attempt > self.config.max_reconnect_attempts
            {
                error!(attempt, "Max reconnection attempts reached");
                self.set_state(ConnectionState::Disconnected);
                return Err(WsError::ConnectionFailed(
                    "Max reconnection attempts reached".to_string(),
                ));
            }

            self.set_state(ConnectionState::Reconnecting);
            Metrics::ws_reconnect(reason);

            let delay = self.calculate_backoff_delay(attempt);
            warn!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during backoff, exiting");
                    self.set_state(ConnectionState::Disconnected);
                    return Ok(());
                }
            }
        }
    }

    /// Open the socket. `Ok` means the handshake completed.
    async fn try_connect(&self) -> WsResult<WsStream> {
        info!(url = %self.config.url, "Connecting to WebSocket");

        let (ws_stream, _response) =
            connect_async_tls_with_config(&self.config.url, None, true, None).await?;

        self.set_state(ConnectionState::Connected);
        *self.reconnect_count.write() = 0;
        self.connections.fetch_add(1, Ordering::Relaxed);
        Metrics::ws_connected();
        info!("WebSocket connected");
        Ok(ws_stream)
    }

    /// Restore subscriptions, then run the message loop until the socket
    /// closes, fails, goes idle or shutdown is requested.
    async fn run_session(&self, ws_stream: WsStream) -> WsResult<()> {
        let (mut write, mut read) = ws_stream.split();

        // Replay before reading anything: the restored session must be in
        // place before the first inbound frame is processed.
        let mut cursor = self.send_pending(&mut write, 0).await?;
        info!(replayed = cursor, "Subscriptions restored");
        self.handler.on_connected(cursor);

        self.idle.reset();

        loop {
            tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in message loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(error = %e, "Failed to send Close frame during shutdown");
                    }
                    self.set_state(ConnectionState::Disconnected);
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_frame(text.as_bytes(), &mut write).await?;
                        }
                        Some(Ok(Message::Binary(data))) => {
                            match self.decoder.decode(data) {
                                Ok(frame) => self.handle_frame(&frame, &mut write).await?,
                                Err(e) => {
                                    self.idle.record_message();
                                    warn!(error = %e, "Dropping undecodable binary frame");
                                    Metrics::decode_error("frame");
                                }
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received transport ping, sending pong");
                            self.idle.record_message();
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            self.idle.record_message();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason): (u16, String) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "WebSocket closed by server");
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("WebSocket stream ended");
                            return Ok(());
                        }
                        _ => {}
                    }
                }

                () = self.subscribe_notify.notified() => {
                    cursor = self.send_pending(&mut write, cursor).await?;
                }

                () = self.idle.wait_for_check() => {
                    if self.idle.is_idle() {
                        error!(
                            idle_ms = self.idle.time_since_last_message_ms(),
                            "No frame received within idle timeout"
                        );
                        return Err(WsError::IdleTimeout(self.idle.timeout_ms()));
                    }
                }
            }
        }
    }

    async fn handle_frame(&self, frame: &[u8], write: &mut WsSink) -> WsResult<()> {
        self.idle.record_message();

        if let FrameAction::Reply(reply) = route_frame(&self.responder, self.handler.as_ref(), frame)
        {
            // Replies go out as text, the same way the exchange expects
            // every client frame.
            let msg = match String::from_utf8(reply) {
                Ok(text) => Message::Text(text),
                Err(e) => Message::Binary(e.into_bytes()),
            };
            write.send(msg).await?;
            Metrics::heartbeat_reply();
        }

        Ok(())
    }

    /// Send every registry entry at or after `cursor`. Returns the new cursor.
    async fn send_pending(&self, write: &mut WsSink, cursor: usize) -> WsResult<usize> {
        let pending = self.registry.pending_from(cursor);

        for subscription in &pending {
            let text = serde_json::to_string(&subscription.request())?;
            write.send(Message::Text(text)).await?;
            Metrics::subscribe_sent(subscription.kind.as_str());
            debug!(channel = %subscription, "Subscribe frame sent");
        }

        Ok(cursor + pending.len())
    }

    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.reconnect_base_delay_ms;
        let max = self.config.reconnect_max_delay_ms;

        // base * 2^(attempt-1), capped
        let exponent = attempt.saturating_sub(1).min(10);
        let delay = base.saturating_mul(1u64 << exponent).min(max);

        let jitter = if self.config.jitter { rand_jitter() } else { 0 };
        Duration::from_millis(delay + jitter)
    }
}

fn reconnect_reason(error: &WsError) -> &'static str {
    match error {
        WsError::ConnectionClosed { .. } => "closed",
        WsError::IdleTimeout(_) => "idle",
        WsError::Tungstenite(_) | WsError::Io(_) => "transport",
        _ => "error",
    }
}

/// Generate random jitter (0-1000ms).
fn rand_jitter() -> u64 {
    rand::thread_rng().gen_range(0..1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn manager(config: ConnectionConfig) -> ConnectionManager {
        let mut handler = MockFrameHandler::new();
        handler.expect_on_frame().returning(|_| ());
        ConnectionManager::new(
            config,
            Arc::new(SubscriptionRegistry::new()),
            Arc::new(handler),
        )
    }

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.max_reconnect_attempts, 0); // Infinite
        assert_eq!(config.idle_timeout_ms, 30000);
    }

    #[test]
    fn test_config_from_partial_toml_like_json() {
        let config: ConnectionConfig =
            serde_json::from_str(r#"{"url": "ws://127.0.0.1:9000", "jitter": false}"#).unwrap();
        assert_eq!(config.url, "ws://127.0.0.1:9000");
        assert!(!config.jitter);
        assert_eq!(config.reconnect_base_delay_ms, 1000);
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let m = manager(ConnectionConfig {
            reconnect_base_delay_ms: 100,
            reconnect_max_delay_ms: 1000,
            jitter: false,
            ..Default::default()
        });
        assert_eq!(m.calculate_backoff_delay(1), Duration::from_millis(100));
        assert_eq!(m.calculate_backoff_delay(2), Duration::from_millis(200));
        assert_eq!(m.calculate_backoff_delay(4), Duration::from_millis(800));
        assert_eq!(m.calculate_backoff_delay(5), Duration::from_millis(1000));
        assert_eq!(m.calculate_backoff_delay(50), Duration::from_millis(1000));
    }

    #[test]
    fn test_initial_state() {
        let m = manager(ConnectionConfig::default());
        assert_eq!(m.state(), ConnectionState::Disconnected);
        assert_eq!(m.connection_count(), 0);
        assert!(!m.is_shutdown());
        m.shutdown();
        assert!(m.is_shutdown());
    }

    #[test]
    fn test_ping_frame_is_answered_and_not_routed() {
        let mut handler = MockFrameHandler::new();
        handler.expect_on_frame().times(0);

        let action = route_frame(&HeartbeatResponder::new(), &handler, br#"{"ping": 12345}"#);
        assert_eq!(action, FrameAction::Reply(br#"{"pong": 12345}"#.to_vec()));
    }

    #[test]
    fn test_data_frame_is_routed_once() {
        let frame = r#"{"ch":"market.btcusdt.detail","ts":1,"tick":{}}"#;
        let mut handler = MockFrameHandler::new();
        handler
            .expect_on_frame()
            .with(eq(frame))
            .times(1)
            .returning(|_| ());

        let action = route_frame(&HeartbeatResponder::new(), &handler, frame.as_bytes());
        assert_eq!(action, FrameAction::Routed);
    }

    #[test]
    fn test_invalid_utf8_is_dropped() {
        let mut handler = MockFrameHandler::new();
        handler.expect_on_frame().times(0);

        let action = route_frame(&HeartbeatResponder::new(), &handler, &[0xff, 0xfe, 0xfd]);
        assert_eq!(action, FrameAction::Dropped);
    }

    #[test]
    fn test_jitter_stays_below_one_second() {
        let m = manager(ConnectionConfig {
            reconnect_base_delay_ms: 100,
            reconnect_max_delay_ms: 100,
            jitter: true,
            ..Default::default()
        });
        for _ in 0..100 {
            let delay = m.calculate_backoff_delay(3);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay < Duration::from_millis(1100));
        }
    }

    #[tokio::test]
    async fn test_gives_up_after_consecutive_failed_attempts() {
        let m = manager(ConnectionConfig {
            url: "ws://127.0.0.1:1".to_string(),
            max_reconnect_attempts: 2,
            reconnect_base_delay_ms: 1,
            reconnect_max_delay_ms: 5,
            jitter: false,
            ..Default::default()
        });

        let err = m.connect().await.unwrap_err();
        assert!(matches!(err, WsError::ConnectionFailed(_)));
        // Initial attempt plus two retries.
        assert_eq!(m.reconnect_count(), 3);
        assert_eq!(m.connection_count(), 0);
        assert_eq!(m.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_shutdown_before_connect_returns_immediately() {
        let m = manager(ConnectionConfig {
            url: "ws://127.0.0.1:1".to_string(),
            ..Default::default()
        });
        m.shutdown();
        assert!(m.connect().await.is_ok());
        assert_eq!(m.state(), ConnectionState::Disconnected);
    }
}
