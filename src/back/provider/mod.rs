use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use super::series::PriceSeries;
use super::session::DateRange;

pub mod finmind;
pub mod yahoo;

pub use finmind::{FinMind, StockInfo};
pub use yahoo::Yahoo;

/// Taiwan listed symbols as written on the global service, e.g. `2330.TW`.
static REGIONAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+)\.TW$").unwrap());

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("no data for {symbol} in the selected range")]
    EmptySeries { symbol: String },

    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: String, end: String },

    #[error("{provider} error: {message}")]
    Api {
        provider: &'static str,
        message: String,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),

    #[error("unrepresentable price: {0}")]
    Price(#[from] rust_decimal::Error),
}

impl FetchError {
    #[inline]
    pub fn is_empty_series(&self) -> bool {
        matches!(self, FetchError::EmptySeries { .. })
    }
}

/// Which provider serves a symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Global { symbol: String },
    Regional { stock_id: String, token: String },
}

impl Route {
    /// `.TW` symbols go to the regional provider, but only with a token.
    pub fn classify(symbol: &str, token: Option<&str>) -> Self {
        let token = token.map(str::trim).filter(|t| !t.is_empty());
        match (REGIONAL.captures(symbol), token) {
            (Some(caps), Some(token)) => Route::Regional {
                stock_id: caps[1].to_string(),
                token: token.to_string(),
            },
            _ => Route::Global {
                symbol: symbol.to_string(),
            },
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            Route::Global { .. } => yahoo::PROVIDER,
            Route::Regional { .. } => finmind::PROVIDER,
        }
    }
}

pub trait Fetch {
    fn fetch(&self, route: &Route, range: &DateRange) -> Result<PriceSeries, FetchError>;

    /// Routes `symbol` and fetches it; an empty result is an error.
    fn fetch_symbol(
        &self,
        symbol: &str,
        range: &DateRange,
        token: Option<&str>,
    ) -> Result<PriceSeries, FetchError> {
        if !range.is_valid() {
            return Err(FetchError::InvalidRange {
                start: range.start.to_string(),
                end: range.end.to_string(),
            });
        }
        let route = Route::classify(symbol, token);
        debug!("fetch {} via {}", symbol, route.provider());
        let series = self.fetch(&route, range)?;
        if series.is_empty() {
            return Err(FetchError::EmptySeries {
                symbol: symbol.to_string(),
            });
        }
        Ok(series)
    }

    /// Taiwan listed stocks; only the regional provider has one.
    fn stock_list(&self, _token: &str) -> Result<Vec<StockInfo>, FetchError> {
        Ok(Vec::new())
    }
}

/// Both HTTP providers behind one [`Fetch`].
pub struct Providers {
    yahoo: Yahoo,
    finmind: FinMind,
}

impl Providers {
    pub fn new() -> Result<Self, FetchError> {
        Ok(Self {
            yahoo: Yahoo::new()?,
            finmind: FinMind::new()?,
        })
    }
}

impl Fetch for Providers {
    fn fetch(&self, route: &Route, range: &DateRange) -> Result<PriceSeries, FetchError> {
        match route {
            Route::Global { symbol } => self.yahoo.daily(symbol, range),
            Route::Regional { stock_id, token } => self.finmind.daily(stock_id, token, range),
        }
    }

    fn stock_list(&self, token: &str) -> Result<Vec<StockInfo>, FetchError> {
        self.finmind.stock_info(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::back::series::PricePoint;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn tw_with_token_goes_regional() {
        assert_eq!(
            Route::classify("2330.TW", Some("tok")),
            Route::Regional {
                stock_id: "2330".into(),
                token: "tok".into()
            }
        );
        assert_eq!(Route::classify("0056.TW", Some("tok")).provider(), "FinMind");
    }

    #[test]
    fn everything_else_goes_global_unchanged() {
        let global = |s: &str| Route::Global { symbol: s.into() };
        assert_eq!(Route::classify("AAPL", Some("tok")), global("AAPL"));
        assert_eq!(Route::classify("AAPL", None), global("AAPL"));
        assert_eq!(Route::classify("2330.TW", None), global("2330.TW"));
        assert_eq!(Route::classify("2330.TW", Some("  ")), global("2330.TW"));
        assert_eq!(Route::classify("6488.TWO", Some("tok")), global("6488.TWO"));
        assert_eq!(Route::classify("2330.tw", Some("tok")), global("2330.tw"));
        assert_eq!(Route::classify(".TW", Some("tok")), global(".TW"));
    }

    struct Canned(Vec<PricePoint>);

    impl Fetch for Canned {
        fn fetch(&self, route: &Route, _range: &DateRange) -> Result<PriceSeries, FetchError> {
            let symbol = match route {
                Route::Global { symbol } => symbol.clone(),
                Route::Regional { stock_id, .. } => stock_id.clone(),
            };
            Ok(PriceSeries::new(&symbol, None, self.0.clone()))
        }
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        )
    }

    #[test]
    fn empty_series_is_an_error() {
        let err = Canned(vec![]).fetch_symbol("AAPL", &range(), None).unwrap_err();
        assert!(err.is_empty_series());
    }

    #[test]
    fn routes_before_fetching() {
        let point = PricePoint {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            close: dec!(593),
        };
        let series = Canned(vec![point])
            .fetch_symbol("2330.TW", &range(), Some("tok"))
            .unwrap();
        assert_eq!(series.symbol, "2330");
    }

    #[test]
    fn reversed_range_is_rejected() {
        let r = range();
        let err = Canned(vec![])
            .fetch_symbol("AAPL", &DateRange::new(r.end, r.start), None)
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidRange { .. }));
    }
}
