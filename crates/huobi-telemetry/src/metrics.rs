//! Prometheus metrics for the market-data client.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error caught on first use.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram_vec,
    register_int_counter, CounterVec, Encoder, Gauge, GaugeVec, HistogramVec, IntCounter,
    TextEncoder,
};

const WS_STATES: [&str; 4] = ["disconnected", "connecting", "connected", "reconnecting"];

/// WebSocket connection state (1 = connected, 0 = disconnected).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "huobi_ws_connected",
        "WebSocket connection state (1=connected)"
    )
    .unwrap()
});

/// Labels: state (disconnected/connecting/connected/reconnecting)
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "huobi_ws_state",
        "WebSocket state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Labels: reason (closed/idle/transport/error/eof)
pub static WS_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "huobi_ws_reconnect_total",
        "Total WebSocket reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

/// Labels: kind (depth/ticker/trade/candle)
pub static SUBSCRIBE_SENT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "huobi_subscribe_sent_total",
        "Total subscribe frames written to the socket",
        &["kind"]
    )
    .unwrap()
});

pub static HEARTBEAT_REPLIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "huobi_heartbeat_replies_total",
        "Total inline keepalive probes answered"
    )
    .unwrap()
});

/// Labels: stage (frame/utf8/envelope/payload)
pub static DECODE_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "huobi_decode_errors_total",
        "Total frames dropped because they could not be decoded",
        &["stage"]
    )
    .unwrap()
});

/// Labels: kind (depth/ticker/trade/candle)
pub static EVENTS_DISPATCHED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "huobi_events_dispatched_total",
        "Total events delivered to user callbacks",
        &["kind"]
    )
    .unwrap()
});

pub static UNKNOWN_CHANNEL_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "huobi_unknown_channel_total",
        "Total data frames whose channel matched no rule"
    )
    .unwrap()
});

/// Labels: status (ok/error)
pub static CONTROL_RESPONSES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "huobi_control_responses_total",
        "Total control acknowledgements received",
        &["status"]
    )
    .unwrap()
});

/// Exchange timestamp to local receive time, in milliseconds.
pub static FEED_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "huobi_feed_latency_ms",
        "Feed message latency in milliseconds",
        &["kind"],
        vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0]
    )
    .unwrap()
});

/// Static accessor for all metrics.
pub struct Metrics;

impl Metrics {
    pub fn ws_connected() {
        WS_CONNECTED.set(1.0);
    }

    pub fn ws_disconnected() {
        WS_CONNECTED.set(0.0);
    }

    /// Only the active state is set to 1.
    pub fn ws_state_set(state: &str) {
        for s in &WS_STATES {
            WS_STATE.with_label_values(&[s]).set(0.0);
        }
        WS_STATE.with_label_values(&[state]).set(1.0);
    }

    pub fn ws_reconnect(reason: &str) {
        WS_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn subscribe_sent(kind: &str) {
        SUBSCRIBE_SENT_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn heartbeat_reply() {
        HEARTBEAT_REPLIES_TOTAL.inc();
    }

    pub fn decode_error(stage: &str) {
        DECODE_ERRORS_TOTAL.with_label_values(&[stage]).inc();
    }

    pub fn events_dispatched(kind: &str, count: usize) {
        EVENTS_DISPATCHED_TOTAL
            .with_label_values(&[kind])
            .inc_by(count as f64);
    }

    pub fn unknown_channel() {
        UNKNOWN_CHANNEL_TOTAL.inc();
    }

    pub fn control_response(status: &str) {
        CONTROL_RESPONSES_TOTAL.with_label_values(&[status]).inc();
    }

    pub fn feed_latency(kind: &str, latency_ms: f64) {
        FEED_LATENCY_MS
            .with_label_values(&[kind])
            .observe(latency_ms);
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_gauge_has_single_active_state() {
        Metrics::ws_state_set("connecting");
        Metrics::ws_state_set("connected");

        assert_eq!(WS_STATE.with_label_values(&["connected"]).get(), 1.0);
        assert_eq!(WS_STATE.with_label_values(&["connecting"]).get(), 0.0);
    }

    #[test]
    fn test_render_includes_touched_metrics() {
        Metrics::subscribe_sent("trade");
        Metrics::heartbeat_reply();

        let text = Metrics::render().unwrap();
        assert!(text.contains("huobi_subscribe_sent_total"));
        assert!(text.contains("huobi_heartbeat_replies_total"));
    }
}
