use crate::error::{SpiderError, SpiderResult};
use crate::model::DividendPoint;
use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer};
use tracing::warn;

/// Textual layout of every upstream date.
pub const DATE_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S";

// getByDate response
// ----------------------------------------------------------------
// [
//   {
//     "ticker": "TSE:ENB",
//     "company": "Enbridge Inc",
//     "yield": 0.0733,
//     "amount": 0.915,
//     "exDate": "2024-02-14T00:00:00",
//     "recDate": "2024-02-15T00:00:00",
//     "payDate": "2024-03-01T00:00:00",
//     ...
//   },
//   ...
// ]
//
// Fields may be absent or null.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct RawRecord {
    #[serde(default, deserialize_with = "null_default")]
    pub ticker: String,
    #[serde(default, rename = "company", deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, rename = "yield", deserialize_with = "null_default")]
    pub dividend_yield: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub amount: f64,
    #[serde(default, rename = "exDate", deserialize_with = "null_default")]
    pub ex_dividend_date: String,
    #[serde(default, rename = "recDate", deserialize_with = "null_default")]
    pub record_date: String,
    #[serde(default, rename = "payDate", deserialize_with = "null_default")]
    pub pay_date: String,
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode a whole response body; any structural failure drops the entire response.
pub fn decode(body: &[u8]) -> SpiderResult<Vec<RawRecord>> {
    Ok(serde_json::from_slice(body)?)
}

/// Parse an upstream date, truncated to midnight UTC. An empty string is "unset".
pub fn parse_day(field: &'static str, text: &str) -> SpiderResult<Option<DateTime<Utc>>> {
    if text.is_empty() {
        return Ok(None);
    }

    let parsed = NaiveDateTime::parse_from_str(text, DATE_LAYOUT).map_err(|err| {
        SpiderError::FieldParse {
            field,
            message: format!("\"{text}\": {err}"),
        }
    })?;

    Ok(Some(parsed.date().and_time(NaiveTime::MIN).and_utc()))
}

/// A normalized point plus every field that could not be parsed.
#[derive(Debug)]
pub struct Normalized {
    pub point: DividendPoint,
    pub issues: Vec<SpiderError>,
}

/// Build a [`DividendPoint`]; each date is parsed on its own, so one bad field never discards
/// the others (or the amount).
pub fn normalize(raw: &RawRecord) -> Normalized {
    let mut issues = Vec::new();
    let mut day = |field: &'static str, text: &str| match parse_day(field, text) {
        Ok(dt) => dt,
        Err(err) => {
            warn!(ticker = %raw.ticker, field, error = %err, "date parse failed");
            issues.push(err);
            None
        }
    };

    let point = DividendPoint {
        dividend: raw.amount,
        ex_dividend_date: day("exDate", &raw.ex_dividend_date),
        record_date: day("recDate", &raw.record_date),
        pay_date: day("payDate", &raw.pay_date),
    };

    Normalized { point, issues }
}
