//! Currency pair identification.
//!
//! The exchange addresses instruments by a single lower-case symbol that is
//! the concatenation of base and quote (`btcusdt`). Channel names only carry
//! that symbol, so the base/quote split is recovered from the known quote
//! currencies when possible.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Quote currencies recognised when splitting a bare symbol.
/// Checked in order; `usdt` must come before anything it could shadow.
const KNOWN_QUOTES: &[&str] = &["usdt", "husd", "usdc", "btc", "eth", "ht", "trx"];

/// Normalized base/quote identifier.
///
/// Immutable once constructed. Equality and hashing use the normalized
/// symbol only: the base/quote split is informational and may be missing
/// for symbols whose quote is not recognised, so a pair built from
/// `("BTC", "USDD")` still equals one parsed from `"btcusdd"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyPair {
    symbol: String,
    base: Option<String>,
    quote: Option<String>,
}

impl CurrencyPair {
    /// Build a pair from exchange symbol tokens (case-insensitive).
    pub fn new(base: &str, quote: &str) -> Result<Self> {
        let base = base.trim().to_lowercase();
        let quote = quote.trim().to_lowercase();
        if base.is_empty() || quote.is_empty() {
            return Err(CoreError::InvalidPair(format!("{base}/{quote}")));
        }
        Ok(Self {
            symbol: format!("{base}{quote}"),
            base: Some(base),
            quote: Some(quote),
        })
    }

    /// Parse a bare channel symbol such as `btcusdt`.
    ///
    /// Never fails: an unrecognised quote leaves base/quote unset but keeps
    /// the lower-cased symbol, which is all routing needs.
    pub fn from_symbol(symbol: &str) -> Self {
        let symbol = symbol.trim().to_lowercase();
        let split = KNOWN_QUOTES.iter().find_map(|quote| {
            symbol
                .strip_suffix(quote)
                .filter(|base| !base.is_empty())
                .map(|base| (base.to_string(), (*quote).to_string()))
        });

        match split {
            Some((base, quote)) => Self {
                symbol,
                base: Some(base),
                quote: Some(quote),
            },
            None => Self {
                symbol,
                base: None,
                quote: None,
            },
        }
    }

    /// Wire symbol (`btcusdt`).
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn quote(&self) -> Option<&str> {
        self.quote.as_deref()
    }

    /// Whether the symbol is empty (channel without a symbol segment).
    pub fn is_empty(&self) -> bool {
        self.symbol.is_empty()
    }
}

impl PartialEq for CurrencyPair {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Eq for CurrencyPair {}

impl Hash for CurrencyPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_lowercases_and_concatenates() {
        let pair = CurrencyPair::new("BTC", "USDT").unwrap();
        assert_eq!(pair.symbol(), "btcusdt");
        assert_eq!(pair.base(), Some("btc"));
        assert_eq!(pair.quote(), Some("usdt"));
        assert_eq!(pair.to_string(), "btcusdt");
    }

    #[test]
    fn test_new_rejects_empty_token() {
        assert!(CurrencyPair::new("", "usdt").is_err());
        assert!(CurrencyPair::new("btc", "  ").is_err());
    }

    #[test]
    fn test_from_symbol_matches_constructed_pair() {
        let parsed = CurrencyPair::from_symbol("BTCUSDT");
        let built = CurrencyPair::new("btc", "usdt").unwrap();
        assert_eq!(parsed, built);
    }

    #[test]
    fn test_from_symbol_cross_pairs() {
        let pair = CurrencyPair::from_symbol("ethbtc");
        assert_eq!(pair.base(), Some("eth"));
        assert_eq!(pair.quote(), Some("btc"));

        let pair = CurrencyPair::from_symbol("dothusd");
        assert_eq!(pair.base(), Some("dot"));
        assert_eq!(pair.quote(), Some("husd"));
    }

    #[test]
    fn test_from_symbol_unknown_quote_keeps_symbol() {
        let pair = CurrencyPair::from_symbol("abcxyz");
        assert_eq!(pair.symbol(), "abcxyz");
        assert_eq!(pair.base(), None);
        assert_eq!(pair.quote(), None);
    }

    #[test]
    fn test_unrecognised_quote_still_equal_to_constructed_pair() {
        use std::collections::HashSet;

        let built = CurrencyPair::new("BTC", "USDD").unwrap();
        let parsed = CurrencyPair::from_symbol("btcusdd");
        assert_eq!(parsed.base(), None);
        assert_eq!(built, parsed);

        let set: HashSet<CurrencyPair> = [built].into_iter().collect();
        assert!(set.contains(&parsed));
    }

    #[test]
    fn test_from_symbol_bare_quote_is_not_split() {
        let pair = CurrencyPair::from_symbol("usdt");
        assert_eq!(pair.symbol(), "usdt");
        assert_eq!(pair.base(), None);
    }
}
