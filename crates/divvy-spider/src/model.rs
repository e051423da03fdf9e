use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ex-dividend day as unix seconds (midnight UTC); the key of a dividend history.
pub type ExDividendKey = i64;

/// One dividend event. Dates are truncated to midnight UTC; a date that failed to parse is
/// `None`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendPoint {
    pub dividend: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ex_dividend_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_date: Option<DateTime<Utc>>,
    #[serde(default, rename = "payoutDate", skip_serializing_if = "Option::is_none")]
    pub pay_date: Option<DateTime<Utc>>,
}

impl DividendPoint {
    /// The history key, if the ex-dividend date is known.
    pub fn key(&self) -> Option<ExDividendKey> {
        self.ex_dividend_date.map(|dt| dt.timestamp())
    }
}

/// The persisted dividend history of one ticker.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerHistory {
    pub ticker: String,
    pub name: String,
    #[serde(rename = "yield")]
    pub dividend_yield: f64,
    pub currency: String,
    pub schema: String,
    pub enabled: bool,
    pub deleted: bool,
    /// Unix seconds; `None` until the first write.
    pub created_at: Option<i64>,
    pub modified_at: i64,
    /// Optimistic-concurrency token; `None` until the first write.
    pub revision: Option<i64>,
    pub dividend_history: BTreeMap<ExDividendKey, DividendPoint>,
}

impl TickerHistory {
    /// Storage key: tickers are matched case-insensitively by uppercasing.
    pub fn storage_key(ticker: &str) -> String {
        ticker.trim().to_uppercase()
    }
}
