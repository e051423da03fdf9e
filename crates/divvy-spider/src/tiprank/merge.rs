use crate::model::{DividendPoint, ExDividendKey, TickerHistory};
use std::collections::BTreeMap;

/// The non-history fields reported alongside a fresh point.
#[derive(Clone, Debug, Default)]
pub struct TickerMeta {
    pub ticker: String,
    pub name: String,
    pub dividend_yield: f64,
    pub currency: String,
    pub schema: String,
}

#[derive(Debug)]
pub struct Merged {
    pub history: TickerHistory,
    /// The fresh point had no ex-dividend date, so it could not be inserted.
    pub unkeyed: bool,
}

/// Union of two histories; entries of `new` win on shared keys and keys only in `old` are kept.
pub fn merge_histories(
    old: &BTreeMap<ExDividendKey, DividendPoint>,
    new: BTreeMap<ExDividendKey, DividendPoint>,
) -> BTreeMap<ExDividendKey, DividendPoint> {
    let mut merged = old.clone();
    merged.extend(new);
    merged
}

/// Combine a freshly fetched point with what is already stored for the ticker.
///
/// Metadata (name, yield, currency, schema) comes from the fresh fetch, except that an empty
/// name or currency, or a zero yield, leaves the stored value in place. Creation time, revision
/// and the enabled/deleted flags are carried over from `existing`.
pub fn merge_point(
    meta: TickerMeta,
    point: DividendPoint,
    existing: Option<&TickerHistory>,
) -> Merged {
    let mut fresh = BTreeMap::new();
    let unkeyed = match point.key() {
        Some(key) => {
            fresh.insert(key, point);
            false
        }
        None => true,
    };

    let mut history = TickerHistory {
        ticker: TickerHistory::storage_key(&meta.ticker),
        name: meta.name,
        dividend_yield: meta.dividend_yield,
        currency: meta.currency,
        schema: meta.schema,
        enabled: true,
        deleted: false,
        created_at: None,
        modified_at: 0,
        revision: None,
        dividend_history: fresh,
    };

    if let Some(existing) = existing {
        history.created_at = existing.created_at;
        history.revision = existing.revision;
        history.enabled = existing.enabled;
        history.deleted = existing.deleted;
        if history.name.is_empty() {
            history.name = existing.name.clone();
        }
        if history.currency.is_empty() {
            history.currency = existing.currency.clone();
        }
        if history.dividend_yield == 0.0 {
            history.dividend_yield = existing.dividend_yield;
        }
        history.dividend_history =
            merge_histories(&existing.dividend_history, history.dividend_history);
    }

    Merged { history, unkeyed }
}
