//! Integration tests for huobi-client.
//!
//! These tests drive a real `SpotWs` against a local mock server:
//! - Connection and subscription lifecycle
//! - Heartbeat replies over gzip framing
//! - Reconnection and subscription replay

pub mod common;
