//! Heartbeat handling for the market-data stream.
//!
//! The exchange probes liveness with frames such as `{"ping": 1611162033214}`
//! and drops the session if they go unanswered. Detection is a plain byte
//! search for `ping` anywhere in the frame; the reply is the same frame with
//! every `ping` turned into `pong`. Nothing is parsed.
//!
//! [`IdleMonitor`] covers the opposite direction: if the server goes quiet
//! for longer than the idle timeout the connection is considered dead.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::time::Duration;
use tracing::debug;

const PING: &[u8] = b"ping";
const PONG: &[u8] = b"pong";

/// Answers inline keepalive probes.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeartbeatResponder;

impl HeartbeatResponder {
    pub fn new() -> Self {
        Self
    }

    /// Returns the reply frame if `frame` is a keepalive probe.
    ///
    /// `None` means the frame was not consumed and must be routed normally.
    pub fn respond(&self, frame: &[u8]) -> Option<Vec<u8>> {
        let mut reply = frame.to_vec();
        let mut replaced = 0usize;
        let mut i = 0;

        // "ping" cannot overlap itself, so a left-to-right scan replaces
        // every occurrence.
        while i + PING.len() <= reply.len() {
            if &reply[i..i + PING.len()] == PING {
                reply[i..i + PONG.len()].copy_from_slice(PONG);
                replaced += 1;
                i += PING.len();
            } else {
                i += 1;
            }
        }

        if replaced == 0 {
            return None;
        }

        debug!(replaced, "Answering heartbeat probe");
        Some(reply)
    }
}

/// Tracks inbound activity to detect a silent server.
pub struct IdleMonitor {
    /// Idle timeout (no inbound frame for this long = dead connection).
    timeout_ms: u64,
    /// Last frame received time (any frame).
    last_message: RwLock<DateTime<Utc>>,
}

impl IdleMonitor {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            last_message: RwLock::new(Utc::now()),
        }
    }

    /// Reset state (called on connection).
    pub fn reset(&self) {
        *self.last_message.write() = Utc::now();
    }

    /// Record that any frame was received.
    pub fn record_message(&self) {
        *self.last_message.write() = Utc::now();
    }

    pub fn time_since_last_message_ms(&self) -> i64 {
        (Utc::now() - *self.last_message.read()).num_milliseconds()
    }

    /// Check if the server has been silent for longer than the timeout.
    pub fn is_idle(&self) -> bool {
        self.time_since_last_message_ms() > self.timeout_ms as i64
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Wait for the next idle check.
    pub async fn wait_for_check(&self) {
        tokio::time::sleep(Duration::from_millis((self.timeout_ms / 4).max(10))).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_reply_replaces_token() {
        let responder = HeartbeatResponder::new();
        let reply = responder.respond(br#"{"ping": 12345}"#).unwrap();
        assert_eq!(reply, br#"{"pong": 12345}"#.to_vec());
    }

    #[test]
    fn test_ping_anywhere_in_body() {
        let responder = HeartbeatResponder::new();
        let frame = br#"{"op":"ping","ts":1,"note":"pingping"}"#;
        let reply = responder.respond(frame).unwrap();
        assert_eq!(reply, br#"{"op":"pong","ts":1,"note":"pongpong"}"#.to_vec());
        assert_eq!(reply.len(), frame.len());
    }

    #[test]
    fn test_data_frame_not_consumed() {
        let responder = HeartbeatResponder::new();
        let frame = br#"{"ch":"market.btcusdt.detail","ts":1,"tick":{}}"#;
        assert!(responder.respond(frame).is_none());
    }

    #[test]
    fn test_short_and_empty_frames() {
        let responder = HeartbeatResponder::new();
        assert!(responder.respond(b"").is_none());
        assert!(responder.respond(b"pin").is_none());
        assert_eq!(responder.respond(b"ping").unwrap(), b"pong".to_vec());
    }

    #[test]
    fn test_idle_monitor_initial_state() {
        let monitor = IdleMonitor::new(30_000);
        assert!(!monitor.is_idle());
        assert!(monitor.time_since_last_message_ms() < 100);
    }

    #[test]
    fn test_idle_monitor_zero_timeout_goes_idle() {
        let monitor = IdleMonitor::new(0);
        std::thread::sleep(Duration::from_millis(5));
        assert!(monitor.is_idle());

        monitor.record_message();
        assert!(monitor.time_since_last_message_ms() < 5);
    }

    #[test]
    fn test_wait_for_check_uses_quarter_timeout() {
        let monitor = IdleMonitor::new(200);
        let start = std::time::Instant::now();
        tokio_test::block_on(monitor.wait_for_check());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
