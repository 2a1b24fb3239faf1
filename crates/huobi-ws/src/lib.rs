//! WebSocket transport for Huobi spot market-data streams.
//!
//! Provides a single managed connection with:
//! - Automatic reconnection with exponential backoff
//! - Ordered subscription replay after every reconnect
//! - Gzip frame decoding at the transport edge
//! - Inline keepalive replies and idle detection

pub mod codec;
pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod message;
pub mod subscription;

pub use codec::{gzip, GzipDecoder};
pub use connection::{
    ConnectionConfig, ConnectionManager, ConnectionState, FrameHandler, DEFAULT_URL,
};
pub use error::{WsError, WsResult};
pub use heartbeat::{HeartbeatResponder, IdleMonitor};
pub use message::{ControlResponse, SubscribeRequest};
pub use subscription::{Subscription, SubscriptionRegistry, DEPTH_LEVELS};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
