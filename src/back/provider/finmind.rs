use std::collections::BTreeMap;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::FetchError;
use crate::back::series::{PricePoint, PriceSeries};
use crate::back::session::DateRange;

pub const PROVIDER: &str = "FinMind";

const BASE_URL: &str = "https://api.finmindtrade.com/api/v4/data";

const CURRENCY: &str = "TWD";

const DATE_FORMAT: &str = "%Y-%m-%d";

// {
//   "msg": "success",
//   "status": 200,
//   "data": [{ "date": "2024-01-02", "stock_id": "2330", "open": 590.0, "max": 593.0,
//              "min": 589.0, "close": 593.0, "spread": 0.0, "Trading_Volume": 26059058 }]
// }
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    msg: String,
    status: u16,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct DailyRow {
    date: NaiveDate,
    close: f64,
}

#[derive(Debug, Deserialize)]
struct InfoRow {
    stock_id: String,
    stock_name: String,
    #[serde(default)]
    industry_category: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StockInfo {
    pub stock_id: String,
    pub stock_name: String,
    pub industry: String,
}

/// Taiwan market datasets from FinMind, authenticated with a bearer token.
pub struct FinMind {
    client: Client,
}

impl FinMind {
    pub fn new() -> Result<Self, FetchError> {
        Ok(Self {
            client: Client::builder().build()?,
        })
    }

    /// Daily closes for a bare stock id such as `2330`; both dates inclusive.
    pub fn daily(
        &self,
        stock_id: &str,
        token: &str,
        range: &DateRange,
    ) -> Result<PriceSeries, FetchError> {
        let start = range.start.format(DATE_FORMAT).to_string();
        let end = range.end.format(DATE_FORMAT).to_string();
        let url = Url::parse_with_params(
            BASE_URL,
            &[
                ("dataset", "TaiwanStockPrice"),
                ("data_id", stock_id),
                ("start_date", start.as_str()),
                ("end_date", end.as_str()),
            ],
        )?;
        let body = self.get(url, token)?;
        decode_daily(stock_id, &body)
    }

    pub fn stock_info(&self, token: &str) -> Result<Vec<StockInfo>, FetchError> {
        let url = Url::parse_with_params(BASE_URL, &[("dataset", "TaiwanStockInfo")])?;
        let body = self.get(url, token)?;
        decode_info(&body)
    }

    fn get(&self, url: Url, token: &str) -> Result<String, FetchError> {
        debug!("GET {}", url);
        // non-2xx responses still carry a {msg, status} body
        let body = self.client.get(url).bearer_auth(token).send()?.text()?;
        Ok(body)
    }
}

fn unwrap_envelope<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, FetchError> {
    let env: Envelope<T> = serde_json::from_str(body)?;
    if env.status != 200 {
        return Err(FetchError::Api {
            provider: PROVIDER,
            message: format!("{} ({})", env.msg, env.status),
        });
    }
    Ok(env.data)
}

fn decode_daily(stock_id: &str, body: &str) -> Result<PriceSeries, FetchError> {
    let rows: Vec<DailyRow> = unwrap_envelope(body)?;
    let points = rows
        .into_iter()
        .map(|row| {
            Ok(PricePoint {
                date: row.date,
                close: Decimal::try_from(row.close)?,
            })
        })
        .collect::<Result<Vec<_>, FetchError>>()?;
    Ok(PriceSeries::new(stock_id, Some(CURRENCY.into()), points))
}

/// One entry per stock id, ordered by id.
fn decode_info(body: &str) -> Result<Vec<StockInfo>, FetchError> {
    let rows: Vec<InfoRow> = unwrap_envelope(body)?;
    let mut by_id = BTreeMap::new();
    for row in rows {
        by_id.entry(row.stock_id.clone()).or_insert(StockInfo {
            stock_id: row.stock_id,
            stock_name: row.stock_name,
            industry: row.industry_category,
        });
    }
    Ok(by_id.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn decodes_daily_rows_in_date_order() {
        let body = r#"{"msg":"success","status":200,"data":[
            {"date":"2024-01-03","stock_id":"2330","open":584.0,"max":585.0,"min":576.0,"close":578.0,"spread":-15.0},
            {"date":"2024-01-02","stock_id":"2330","open":590.0,"max":593.0,"min":589.0,"close":593.0,"spread":0.0}
        ]}"#;
        let s = decode_daily("2330", body).unwrap();
        assert_eq!(s.symbol, "2330");
        assert_eq!(s.currency.as_deref(), Some("TWD"));
        assert_eq!(s.closes(), vec![dec!(593), dec!(578)]);
        assert_eq!(s.quote().unwrap().change, dec!(-15));
    }

    #[test]
    fn empty_data_is_empty_series() {
        let body = r#"{"msg":"success","status":200,"data":[]}"#;
        assert!(decode_daily("9999", body).unwrap().is_empty());
    }

    #[test]
    fn non_200_status_is_api_error() {
        let body = r#"{"msg":"Requests reach the upper limit.","status":402}"#;
        match decode_daily("2330", body) {
            Err(FetchError::Api { provider, message }) => {
                assert_eq!(provider, "FinMind");
                assert!(message.contains("upper limit"));
                assert!(message.contains("402"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn stock_list_is_deduplicated_and_sorted() {
        let body = r#"{"msg":"success","status":200,"data":[
            {"industry_category":"ETF","stock_id":"0056","stock_name":"元大高股息","type":"twse","date":"2024-01-02"},
            {"industry_category":"半導體業","stock_id":"2330","stock_name":"台積電","type":"twse","date":"2024-01-02"},
            {"industry_category":"電子工業","stock_id":"2330","stock_name":"台積電","type":"twse","date":"2024-01-02"},
            {"industry_category":"ETF","stock_id":"0050","stock_name":"元大台灣50","type":"twse","date":"2024-01-02"}
        ]}"#;
        let list = decode_info(body).unwrap();
        let ids: Vec<&str> = list.iter().map(|s| s.stock_id.as_str()).collect();
        assert_eq!(ids, vec!["0050", "0056", "2330"]);
        assert_eq!(list[2].industry, "半導體業");
    }
}
