//! Channel classification.
//!
//! Maps a channel name such as `market.btcusdt.trade.detail` to the payload
//! schema it carries. Rules are evaluated top to bottom and the first match
//! wins. Order matters: `.trade.detail` also ends with `.detail`, so the
//! trade rule must be checked before the ticker rule.

use huobi_core::{ChannelKind, CurrencyPair, KlinePeriod};
use tracing::warn;

/// One entry of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct ChannelRule {
    /// Short label used in logs and tests.
    pub name: &'static str,
    pub matches: fn(&str) -> bool,
    pub kind: ChannelKind,
}

fn is_mbp_refresh(channel: &str) -> bool {
    channel.contains("mbp.refresh")
}

fn is_depth_step(channel: &str) -> bool {
    channel.contains(".depth.step")
}

fn is_kline(channel: &str) -> bool {
    channel.contains("kline")
}

fn is_trade_detail(channel: &str) -> bool {
    channel.ends_with(".trade.detail")
}

fn is_detail(channel: &str) -> bool {
    channel.ends_with(".detail")
}

/// Ordered classification table. First match wins.
pub const CHANNEL_RULES: &[ChannelRule] = &[
    ChannelRule {
        name: "mbp.refresh",
        matches: is_mbp_refresh,
        kind: ChannelKind::Depth,
    },
    ChannelRule {
        name: "depth.step",
        matches: is_depth_step,
        kind: ChannelKind::Depth,
    },
    ChannelRule {
        name: "kline",
        matches: is_kline,
        kind: ChannelKind::Candle,
    },
    // Must stay above the ticker rule.
    ChannelRule {
        name: "trade.detail",
        matches: is_trade_detail,
        kind: ChannelKind::Trade,
    },
    ChannelRule {
        name: "detail",
        matches: is_detail,
        kind: ChannelKind::Ticker,
    },
];

/// Result of classifying a channel name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// `None` when no rule matched.
    pub kind: Option<ChannelKind>,
    /// Second dot segment, lower-cased. Empty when absent.
    pub pair: CurrencyPair,
    /// Only set for candle channels.
    pub period: Option<KlinePeriod>,
}

impl Classification {
    pub fn is_unknown(&self) -> bool {
        self.kind.is_none()
    }
}

/// Classify a channel name.
pub fn classify(channel: &str) -> Classification {
    let mut segments = channel.split('.');
    let symbol = segments.nth(1).unwrap_or("");
    let pair = CurrencyPair::from_symbol(symbol);

    let kind = CHANNEL_RULES
        .iter()
        .find(|rule| (rule.matches)(channel))
        .map(|rule| rule.kind);

    let period = match kind {
        Some(ChannelKind::Candle) => Some(candle_period(channel)),
        _ => None,
    };

    Classification { kind, pair, period }
}

/// Period token is the fourth dot segment: `market.<sym>.kline.<period>`.
fn candle_period(channel: &str) -> KlinePeriod {
    let token = channel.split('.').nth(3).unwrap_or("");
    let (period, fell_back) = KlinePeriod::from_token_or_fallback(token);
    if fell_back {
        warn!(
            channel,
            token,
            fallback = %period,
            "Unrecognized candle period, using fallback"
        );
    }
    period
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_detail_is_trade_not_ticker() {
        let c = classify("market.ethusdt.trade.detail");
        assert_eq!(c.kind, Some(ChannelKind::Trade));
        assert_eq!(c.pair.symbol(), "ethusdt");
        assert_eq!(c.period, None);
    }

    #[test]
    fn test_detail_is_ticker() {
        let c = classify("market.btcusdt.detail");
        assert_eq!(c.kind, Some(ChannelKind::Ticker));
    }

    #[test]
    fn test_mbp_refresh_wins_over_other_substrings() {
        // Contains "detail" and "kline" too; depth still wins.
        for ch in [
            "market.btcusdt.mbp.refresh.20",
            "market.btcusdt.mbp.refresh.5",
            "market.klineusdt.mbp.refresh.20",
            "market.btcusdt.mbp.refresh.trade.detail",
        ] {
            assert_eq!(classify(ch).kind, Some(ChannelKind::Depth), "{ch}");
        }
    }

    #[test]
    fn test_depth_step_is_depth() {
        let c = classify("market.ethbtc.depth.step0");
        assert_eq!(c.kind, Some(ChannelKind::Depth));
        assert_eq!(c.pair.base(), Some("eth"));
        assert_eq!(c.pair.quote(), Some("btc"));
    }

    #[test]
    fn test_kline_period_parsed() {
        let c = classify("market.btcusdt.kline.4hour");
        assert_eq!(c.kind, Some(ChannelKind::Candle));
        assert_eq!(c.period, Some(KlinePeriod::Hour4));
    }

    #[test]
    fn test_unknown_kline_period_falls_back_to_one_minute() {
        assert_eq!(
            classify("market.btcusdt.kline.17min").period,
            Some(KlinePeriod::Min1)
        );
        // No fourth segment at all.
        assert_eq!(
            classify("market.btcusdt.kline").period,
            Some(KlinePeriod::Min1)
        );
    }

    #[test]
    fn test_pair_lowercased() {
        let c = classify("market.BTCUSDT.detail");
        assert_eq!(c.pair.symbol(), "btcusdt");
    }

    #[test]
    fn test_pair_matches_subscribed_pair_for_unlisted_quote() {
        let c = classify("market.btcusdd.trade.detail");
        assert_eq!(c.pair, CurrencyPair::new("btc", "usdd").unwrap());
    }

    #[test]
    fn test_unknown_channel() {
        let c = classify("market.btcusdt.bbo");
        assert!(c.is_unknown());
        assert_eq!(c.pair.symbol(), "btcusdt");
    }

    #[test]
    fn test_channel_without_symbol() {
        let c = classify("heartbeat");
        assert!(c.is_unknown());
        assert!(c.pair.is_empty());
    }

    #[test]
    fn test_rule_order() {
        let names: Vec<&str> = CHANNEL_RULES.iter().map(|r| r.name).collect();
        let trade = names.iter().position(|n| *n == "trade.detail").unwrap();
        let ticker = names.iter().position(|n| *n == "detail").unwrap();
        assert!(trade < ticker);
        assert_eq!(names[0], "mbp.refresh");
    }
}
