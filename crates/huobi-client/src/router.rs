//! Frame routing.
//!
//! Receives every non-heartbeat frame from the connection task. Data
//! frames (`ch` present) go to the [`EventDispatcher`]; control replies
//! (`status` present) are logged. Anything that fails to decode is logged
//! and dropped, and the connection stays up.

use chrono::Utc;
use huobi_feed::{DispatchOutcome, EventDispatcher, EventHandlers, WireEnvelope};
use huobi_telemetry::Metrics;
use huobi_ws::{ControlResponse, FrameHandler};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the router did with one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Dispatched(DispatchOutcome),
    /// Subscription acknowledgement or rejection.
    Control { ok: bool },
    /// Malformed or unrecognized; logged and dropped.
    Dropped,
}

/// Routes decoded frames to the event dispatcher.
pub struct FrameRouter {
    dispatcher: EventDispatcher,
}

impl FrameRouter {
    pub fn new(handlers: Arc<EventHandlers>) -> Self {
        Self {
            dispatcher: EventDispatcher::new(handlers),
        }
    }

    pub fn route(&self, frame: &str) -> RouteOutcome {
        let value: Value = match serde_json::from_str(frame) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, frame, "Dropping malformed frame");
                Metrics::decode_error("envelope");
                return RouteOutcome::Dropped;
            }
        };

        if value.get("ch").is_some() {
            return self.route_data(frame, value);
        }
        if value.get("status").is_some() {
            return route_control(frame, value);
        }

        warn!(frame, "Dropping frame with neither channel nor status");
        Metrics::decode_error("envelope");
        RouteOutcome::Dropped
    }

    fn route_data(&self, frame: &str, value: Value) -> RouteOutcome {
        let envelope: WireEnvelope = match serde_json::from_value(value) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, frame, "Dropping frame with invalid envelope");
                Metrics::decode_error("envelope");
                return RouteOutcome::Dropped;
            }
        };

        match self.dispatcher.dispatch(&envelope) {
            Ok(outcome) => {
                match outcome {
                    DispatchOutcome::Delivered { kind, events } => {
                        Metrics::events_dispatched(kind.as_str(), events);
                        let latency_ms = Utc::now().timestamp_millis() - envelope.ts;
                        Metrics::feed_latency(kind.as_str(), latency_ms.max(0) as f64);
                    }
                    DispatchOutcome::Unknown => {
                        warn!(channel = %envelope.ch, raw = %frame, "Unknown channel");
                        Metrics::unknown_channel();
                    }
                    DispatchOutcome::Unhandled(_) => {}
                }
                RouteOutcome::Dispatched(outcome)
            }
            Err(e) => {
                warn!(channel = %envelope.ch, error = %e, "Dropping undecodable payload");
                Metrics::decode_error("payload");
                RouteOutcome::Dropped
            }
        }
    }
}

fn route_control(frame: &str, value: Value) -> RouteOutcome {
    let response: ControlResponse = match serde_json::from_value(value) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, frame, "Dropping malformed control reply");
            Metrics::decode_error("envelope");
            return RouteOutcome::Dropped;
        }
    };

    Metrics::control_response(&response.status);
    let ok = response.is_ok();
    if ok {
        info!(
            id = response.id.as_deref().unwrap_or(""),
            subbed = response.subbed.as_deref().unwrap_or(""),
            "Subscription acknowledged"
        );
    } else {
        warn!(
            id = response.id.as_deref().unwrap_or(""),
            err_code = response.err_code.as_deref().unwrap_or(""),
            err_msg = response.err_msg.as_deref().unwrap_or(""),
            "Subscription rejected"
        );
    }
    RouteOutcome::Control { ok }
}

impl FrameHandler for FrameRouter {
    fn on_frame(&self, frame: &str) {
        self.route(frame);
    }

    fn on_connected(&self, replayed: usize) {
        debug!(replayed, "Router ready for new connection");
    }
}
