use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_WATCHLIST: &str =
    "TSMC:2330.TW, Apple:AAPL, Bitcoin:BTC-USD, Yuanta High Dividend:0056.TW";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchItem {
    pub name: String,
    pub symbol: String,
}

impl WatchItem {
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
        }
    }
}

/// Parses `"Name:Symbol, Name:Symbol"` into watch items, keeping input order.
///
/// Tokens without a colon are skipped. Tokens with more than one colon, or
/// with a blank name or symbol, are rejected. Duplicates are kept.
pub fn parse_watchlist(input: &str) -> Vec<WatchItem> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| token.contains(':'))
        .filter_map(parse_token)
        .collect()
}

fn parse_token(token: &str) -> Option<WatchItem> {
    let (name, symbol) = token.split_once(':')?;
    let (name, symbol) = (name.trim(), symbol.trim());
    if symbol.contains(':') {
        debug!("skip token {:?}: more than one colon", token);
        return None;
    }
    if name.is_empty() || symbol.is_empty() {
        debug!("skip token {:?}: blank name or symbol", token);
        return None;
    }
    Some(WatchItem::new(name, symbol))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_in_order() {
        assert_eq!(
            parse_watchlist("A:1, B:2"),
            vec![WatchItem::new("A", "1"), WatchItem::new("B", "2")]
        );
    }

    #[test]
    fn drops_tokens_without_colon() {
        assert_eq!(parse_watchlist("A:1, bad, B:2"), parse_watchlist("A:1, B:2"));
    }

    #[test]
    fn trims_both_sides() {
        assert_eq!(
            parse_watchlist("  TSMC :  2330.TW  ,Apple:AAPL"),
            vec![WatchItem::new("TSMC", "2330.TW"), WatchItem::new("Apple", "AAPL")]
        );
    }

    #[test]
    fn keeps_duplicates() {
        let items = parse_watchlist("A:AAPL, A:AAPL");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], items[1]);
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(parse_watchlist("A:B:C").is_empty());
        assert!(parse_watchlist(" :AAPL").is_empty());
        assert!(parse_watchlist("Apple: ").is_empty());
        assert_eq!(
            parse_watchlist("A:B:C, ok:MSFT, :x"),
            vec![WatchItem::new("ok", "MSFT")]
        );
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(parse_watchlist("").is_empty());
        assert!(parse_watchlist(" , ,").is_empty());
    }

    #[test]
    fn reparsing_is_identical() {
        assert_eq!(
            parse_watchlist(DEFAULT_WATCHLIST),
            parse_watchlist(DEFAULT_WATCHLIST)
        );
        assert_eq!(parse_watchlist(DEFAULT_WATCHLIST).len(), 4);
    }
}
