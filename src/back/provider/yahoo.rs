use chrono::{DateTime, Duration, NaiveDate};
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::FetchError;
use crate::back::series::{PricePoint, PriceSeries};
use crate::back::session::DateRange;

pub const PROVIDER: &str = "Yahoo";

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart/";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

// {
//   "chart": {
//     "result": [{
//       "meta": { "currency": "USD", "symbol": "AAPL", "gmtoffset": -14400 },
//       "timestamp": [1704205800, ...],
//       "indicators": { "quote": [{ "close": [185.64, null, ...] }] }
//     }],
//     "error": null
//   }
// }
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Meta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    currency: Option<String>,
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Daily bars from the Yahoo Finance chart endpoint.
pub struct Yahoo {
    client: Client,
}

impl Yahoo {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }

    pub fn daily(&self, symbol: &str, range: &DateRange) -> Result<PriceSeries, FetchError> {
        let url = chart_url(symbol, range)?;
        debug!("GET {}", url);
        let resp = self.client.get(url).send()?;
        let status = resp.status();
        let body = resp.text()?;
        match decode(symbol, &body) {
            // error pages that are not chart JSON
            Err(FetchError::Decode(e)) if !status.is_success() => {
                debug!("undecodable {} body: {}", status, e);
                Err(FetchError::Api {
                    provider: PROVIDER,
                    message: format!("HTTP {}", status),
                })
            }
            other => other,
        }
    }
}

/// `period2` is exclusive, so bars on `range.end` itself are not included.
fn chart_url(symbol: &str, range: &DateRange) -> Result<Url, FetchError> {
    let mut url = Url::parse(BASE_URL)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .push(symbol);
    url.query_pairs_mut()
        .append_pair("period1", &midnight_utc(range.start).to_string())
        .append_pair("period2", &midnight_utc(range.end).to_string())
        .append_pair("interval", "1d")
        .append_pair("events", "history");
    Ok(url)
}

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

fn decode(symbol: &str, body: &str) -> Result<PriceSeries, FetchError> {
    let resp: ChartResponse = serde_json::from_str(body)?;
    if let Some(err) = resp.chart.error {
        return Err(FetchError::Api {
            provider: PROVIDER,
            message: format!("{}: {}", err.code, err.description),
        });
    }
    let Some(result) = resp.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(PriceSeries::new(symbol, None, Vec::new()));
    };

    let offset = Duration::seconds(result.meta.gmtoffset);
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let mut points = Vec::with_capacity(closes.len());
    for (ts, close) in result.timestamp.iter().zip(closes) {
        let (Some(close), Some(at)) = (close, DateTime::from_timestamp(*ts, 0)) else {
            continue;
        };
        points.push(PricePoint {
            date: (at.naive_utc() + offset).date(),
            close: Decimal::try_from(close)?,
        });
    }
    Ok(PriceSeries::new(symbol, result.meta.currency, points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const AAPL: &str = r#"{"chart":{"result":[{
        "meta":{"currency":"USD","symbol":"AAPL","gmtoffset":-18000},
        "timestamp":[1704205800,1704292200,1704378600],
        "indicators":{"quote":[{"close":[185.64,null,181.91],"open":[187.15,184.22,182.15]}]}
    }],"error":null}}"#;

    #[test]
    fn decodes_closes_and_skips_nulls() {
        let s = decode("AAPL", AAPL).unwrap();
        assert_eq!(s.currency.as_deref(), Some("USD"));
        assert_eq!(s.len(), 2);
        assert_eq!(s.closes(), vec![dec!(185.64), dec!(181.91)]);
        assert_eq!(s.points[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(s.points[1].date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
    }

    #[test]
    fn chart_error_is_api_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        match decode("NOPE", body) {
            Err(FetchError::Api { provider, message }) => {
                assert_eq!(provider, PROVIDER);
                assert!(message.contains("delisted"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_timestamps_is_empty() {
        let body = r#"{"chart":{"result":[{"meta":{"currency":"USD"},"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(decode("AAPL", body).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_decode_error() {
        assert!(matches!(decode("AAPL", "<html>"), Err(FetchError::Decode(_))));
    }

    #[test]
    fn url_encodes_symbol_and_range() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        );
        let url = chart_url("BRK/B", &range).unwrap();
        assert_eq!(url.path(), "/v8/finance/chart/BRK%2FB");
        let query = url.query().unwrap();
        assert!(query.contains("period1=1704067200"));
        assert!(query.contains("period2=1704153600"));
        assert!(query.contains("interval=1d"));
    }
}
