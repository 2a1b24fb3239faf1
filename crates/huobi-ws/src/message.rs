//! Control frames exchanged with the market-data endpoint.

use serde::{Deserialize, Serialize};

/// Outgoing subscribe request.
///
/// `{"id": "spot.trade", "sub": "market.btcusdt.trade.detail"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    /// Client-chosen topic tag, echoed back in the acknowledgement.
    pub id: String,
    /// Channel name.
    pub sub: String,
}

impl SubscribeRequest {
    pub fn new(id: impl Into<String>, sub: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sub: sub.into(),
        }
    }
}

/// Reply to a control request (subscribe acknowledgement or error).
///
/// These frames carry `status` and never `ch`:
/// - `{"id":"spot.trade","status":"ok","subbed":"market.btcusdt.trade.detail","ts":1}`
/// - `{"status":"error","err-code":"bad-request","err-msg":"invalid topic","ts":1}`
#[derive(Debug, Clone, Deserialize)]
pub struct ControlResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub subbed: Option<String>,
    #[serde(rename = "err-code", default)]
    pub err_code: Option<String>,
    #[serde(rename = "err-msg", default)]
    pub err_msg: Option<String>,
    #[serde(default)]
    pub ts: Option<i64>,
}

impl ControlResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
