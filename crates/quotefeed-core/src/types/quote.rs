//! Quote snapshots and symbol lookup results.

use serde::{Deserialize, Serialize};

use crate::error::HubError;

/// A point-in-time price snapshot for a symbol.
///
/// Snapshots are immutable: a newer quote supersedes an older one, it is
/// never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Symbol
    pub symbol: String,
    /// Last traded price
    pub price: f64,
    /// Absolute change against the previous close
    pub change: f64,
    /// Percent change against the previous close
    pub change_percent: f64,
    /// Session high
    pub high: f64,
    /// Session low
    pub low: f64,
    /// Session open
    pub open: f64,
    /// Previous session close
    pub previous_close: f64,
    /// Session volume
    pub volume: f64,
    /// Snapshot time (Unix milliseconds)
    pub timestamp_ms: i64,
}

impl Quote {
    /// True when `other` carries a different market state than `self`.
    ///
    /// Used by the poller to skip broadcasting unchanged snapshots.
    pub fn differs_from(&self, other: &Quote) -> bool {
        self.timestamp_ms != other.timestamp_ms
            || self.price != other.price
            || self.volume != other.volume
    }
}

/// One hit from a symbol search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolMatch {
    /// Provider symbol
    pub symbol: String,
    /// Human-facing symbol
    pub display_symbol: String,
    /// Security name
    pub description: String,
    /// Security type (e.g. "Common Stock")
    #[serde(rename = "type")]
    pub kind: String,
}

/// Longest ticker accepted.
pub const MAX_SYMBOL_LEN: usize = 32;

/// Normalize a ticker: trim whitespace and uppercase.
///
/// Tickers are ASCII letters and digits plus `. - _ : ^ =` (class shares,
/// exchange prefixes, index and FX symbols). The first character must be
/// a letter, a digit or `^`, so a symbol never names a path.
pub fn normalize_symbol(symbol: &str) -> Result<String, HubError> {
    let normalized = symbol.trim().to_ascii_uppercase();
    let valid_start = normalized
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '^');
    let valid_chars = normalized
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '^' | '='));
    if !valid_start || !valid_chars || normalized.len() > MAX_SYMBOL_LEN {
        return Err(HubError::InvalidSymbol(symbol.to_string()));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(price: f64, ts: i64) -> Quote {
        Quote {
            symbol: "AAPL".to_string(),
            price,
            change: 1.0,
            change_percent: 0.5,
            high: 201.0,
            low: 198.0,
            open: 199.0,
            previous_close: 199.0,
            volume: 1000.0,
            timestamp_ms: ts,
        }
    }

    #[test]
    fn test_quote_wire_format() {
        let json = serde_json::to_value(quote(200.0, 1_700_000_000_000)).unwrap();
        assert_eq!(json["changePercent"], 0.5);
        assert_eq!(json["previousClose"], 199.0);
        assert_eq!(json["timestampMs"], 1_700_000_000_000i64);
    }

    #[test]
    fn test_differs_from() {
        assert!(!quote(200.0, 1).differs_from(&quote(200.0, 1)));
        assert!(quote(200.0, 1).differs_from(&quote(201.0, 1)));
        assert!(quote(200.0, 1).differs_from(&quote(200.0, 2)));
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_symbol("brk.b").unwrap(), "BRK.B");
        assert!(normalize_symbol("   ").is_err());
        assert!(normalize_symbol("A B").is_err());
    }

    #[test]
    fn test_normalize_symbol_charset() {
        for ok in ["^GSPC", "EURUSD=X", "BINANCE:BTCUSDT", "RDS-A", "7203.T"] {
            assert!(normalize_symbol(ok).is_ok(), "{ok}");
        }
        for bad in ["/ETC/X", "../../FOO", "..", ".HIDDEN", "A/B", "AAPL\\X", "ÄPFEL", "A\0"] {
            assert!(
                matches!(normalize_symbol(bad), Err(HubError::InvalidSymbol(_))),
                "{bad:?}"
            );
        }
        assert!(normalize_symbol(&"X".repeat(MAX_SYMBOL_LEN + 1)).is_err());
    }

    #[test]
    fn test_symbol_match_type_field() {
        let m: SymbolMatch = serde_json::from_str(
            r#"{"symbol":"AAPL","displaySymbol":"AAPL","description":"APPLE INC","type":"Common Stock"}"#,
        )
        .unwrap();
        assert_eq!(m.kind, "Common Stock");
    }
}
