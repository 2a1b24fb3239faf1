//! Candle granularity and its wire-token codec.
//!
//! Forward mapping (period -> token) is total and written out as a `match`.
//! Reverse mapping (token -> period) is partial: only tokens produced by a
//! known period resolve. Callers that must always get a period use
//! [`KlinePeriod::from_token_or_fallback`], which applies the named
//! [`KlinePeriod::FALLBACK`] policy.

use crate::error::CoreError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Candle aggregation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KlinePeriod {
    #[serde(rename = "1min")]
    Min1,
    #[serde(rename = "5min")]
    Min5,
    #[serde(rename = "15min")]
    Min15,
    #[serde(rename = "30min")]
    Min30,
    #[serde(rename = "60min")]
    Min60,
    #[serde(rename = "4hour")]
    Hour4,
    #[serde(rename = "1day")]
    Day1,
    #[serde(rename = "1week")]
    Week1,
    #[serde(rename = "1mon")]
    Month1,
    #[serde(rename = "1year")]
    Year1,
}

/// Immutable reverse table, built once.
static TOKEN_TO_PERIOD: Lazy<HashMap<&'static str, KlinePeriod>> = Lazy::new(|| {
    KlinePeriod::ALL
        .iter()
        .map(|period| (period.token(), *period))
        .collect()
});

impl KlinePeriod {
    /// Every known period, shortest first.
    pub const ALL: [KlinePeriod; 10] = [
        Self::Min1,
        Self::Min5,
        Self::Min15,
        Self::Min30,
        Self::Min60,
        Self::Hour4,
        Self::Day1,
        Self::Week1,
        Self::Month1,
        Self::Year1,
    ];

    /// Period assumed when a wire token is not recognised.
    ///
    /// Unknown tokens resolve to the shortest granularity instead of failing.
    /// Kept for wire compatibility; see DESIGN.md for the open question.
    pub const FALLBACK: KlinePeriod = Self::Min1;

    /// Exchange wire token for this period.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Min1 => "1min",
            Self::Min5 => "5min",
            Self::Min15 => "15min",
            Self::Min30 => "30min",
            Self::Min60 => "60min",
            Self::Hour4 => "4hour",
            Self::Day1 => "1day",
            Self::Week1 => "1week",
            Self::Month1 => "1mon",
            Self::Year1 => "1year",
        }
    }

    /// Strict reverse lookup.
    pub fn from_token(token: &str) -> Option<Self> {
        TOKEN_TO_PERIOD.get(token).copied()
    }

    /// Reverse lookup with the [`Self::FALLBACK`] policy.
    ///
    /// Returns the period and whether the fallback was taken, so the caller
    /// can log it.
    pub fn from_token_or_fallback(token: &str) -> (Self, bool) {
        match Self::from_token(token) {
            Some(period) => (period, false),
            None => (Self::FALLBACK, true),
        }
    }
}

impl Default for KlinePeriod {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl fmt::Display for KlinePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for KlinePeriod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s).ok_or_else(|| CoreError::UnknownPeriod(s.to_string()))
    }
}
