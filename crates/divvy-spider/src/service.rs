use crate::error::{SpiderError, SpiderResult};
use crate::lookup::country_currency;
use crate::model::TickerHistory;
use crate::store::{HistoryStore, Upsert};
use crate::tiprank::de::{normalize, RawRecord};
use crate::tiprank::merge::{merge_point, TickerMeta};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// A write needs at most one re-read after a conflict.
const WRITE_ATTEMPTS: usize = 2;

/// What happened to one record that was written.
#[derive(Debug, PartialEq, Eq)]
pub struct Added {
    pub ticker: String,
    pub upsert: Upsert,
    /// The record had no usable ex-dividend date; only its metadata was stored.
    pub unkeyed: bool,
    /// Fields that failed to parse or look up, and were left unset.
    pub ignored_issues: usize,
}

/// Adds TipRanks dividend records to the stored histories.
pub struct DividendService<S> {
    store: Arc<S>,
    schema_version: String,
}

impl<S: HistoryStore> DividendService<S> {
    pub fn new(store: Arc<S>, schema_version: impl Into<String>) -> Self {
        Self {
            store,
            schema_version: schema_version.into(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Normalize `raw`, merge it into the stored history for its ticker and write the result.
    ///
    /// Bad dates and unknown countries are logged and tolerated; storage failures are returned.
    pub async fn add_dividend(&self, raw: &RawRecord, country: &str) -> SpiderResult<Added> {
        let ticker = TickerHistory::storage_key(&raw.ticker);
        if ticker.is_empty() {
            warn!(country, name = %raw.name, "record has no ticker; skipped");
            return Err(SpiderError::FieldParse {
                field: "ticker",
                message: "empty ticker".to_string(),
            });
        }
        trace!(ticker = %ticker, country, "adding TipRank dividend");

        let mut ignored_issues = 0;
        let currency = match country_currency(country) {
            Ok(currency) => currency.to_string(),
            Err(err) => {
                warn!(ticker = %ticker, country, error = %err, "get country currency failed");
                ignored_issues += 1;
                String::new()
            }
        };

        let normalized = normalize(raw);
        ignored_issues += normalized.issues.len();

        let meta = TickerMeta {
            ticker: ticker.clone(),
            name: raw.name.clone(),
            dividend_yield: raw.dividend_yield,
            currency,
            schema: self.schema_version.clone(),
        };

        for attempt in 1..=WRITE_ATTEMPTS {
            let existing = self.store.find(&ticker).await.map_err(|err| {
                error!(ticker = %ticker, error = %err, "find dividend history failed");
                err
            })?;

            let merged = merge_point(meta.clone(), normalized.point.clone(), existing.as_ref());
            if merged.unkeyed {
                warn!(ticker = %ticker, "no ex-dividend date; dividend point ignored");
            }

            let upsert = self.store.upsert(&merged.history).await.map_err(|err| {
                error!(ticker = %ticker, error = %err, "upsert dividend history failed");
                err
            })?;

            if upsert != Upsert::Conflict {
                debug!(ticker = %ticker, ?upsert, "dividend history written");
                return Ok(Added {
                    ticker,
                    upsert,
                    unkeyed: merged.unkeyed,
                    ignored_issues,
                });
            }
            debug!(ticker = %ticker, attempt, "dividend history changed concurrently");
        }

        error!(ticker = %ticker, "upsert dividend history failed after retry");
        Err(SpiderError::Conflict { ticker })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn raw(ticker: &str, amount: f64, ex: &str) -> RawRecord {
        RawRecord {
            ticker: ticker.to_string(),
            name: "ABC Corp".to_string(),
            dividend_yield: 0.04,
            amount,
            ex_dividend_date: ex.to_string(),
            ..Default::default()
        }
    }

    fn key(y: i32, m: u32, d: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap().timestamp()
    }

    #[tokio::test]
    async fn two_cycles_accumulate() {
        let service = DividendService::new(Arc::new(MemoryStore::new()), "1.0.0");

        let first = service
            .add_dividend(&raw("ABC", 0.50, "2024-01-15T00:00:00"), "US")
            .await
            .unwrap();
        assert_eq!(first.upsert, Upsert::Inserted { revision: 0 });

        let second = service
            .add_dividend(&raw("abc", 0.55, "2024-02-15T00:00:00"), "US")
            .await
            .unwrap();
        assert_eq!(second.upsert, Upsert::Updated { revision: 1 });

        let stored = service.store().find("ABC").await.unwrap().unwrap();
        assert_eq!(stored.currency, "USD");
        assert_eq!(stored.schema, "1.0.0");
        assert_eq!(stored.dividend_history.len(), 2);
        assert_eq!(stored.dividend_history[&key(2024, 1, 15)].dividend, 0.50);
        assert_eq!(stored.dividend_history[&key(2024, 2, 15)].dividend, 0.55);
    }

    #[tokio::test]
    async fn unknown_country_is_not_fatal() {
        let service = DividendService::new(Arc::new(MemoryStore::new()), "1.0.0");
        let added = service
            .add_dividend(&raw("ABC", 0.50, "2024-01-15T00:00:00"), "Atlantis")
            .await
            .unwrap();
        assert_eq!(added.ignored_issues, 1);

        let stored = service.store().find("ABC").await.unwrap().unwrap();
        assert_eq!(stored.currency, "");
        assert_eq!(stored.dividend_history.len(), 1);
    }

    #[tokio::test]
    async fn unkeyed_point_stores_metadata_only() {
        let service = DividendService::new(Arc::new(MemoryStore::new()), "1.0.0");
        let added = service
            .add_dividend(&raw("ABC", 0.50, "not-a-date"), "US")
            .await
            .unwrap();
        assert!(added.unkeyed);

        let stored = service.store().find("ABC").await.unwrap().unwrap();
        assert_eq!(stored.name, "ABC Corp");
        assert!(stored.dividend_history.is_empty());
    }

    #[tokio::test]
    async fn lookup_miss_keeps_stored_metadata() {
        let service = DividendService::new(Arc::new(MemoryStore::new()), "1.0.0");
        service
            .add_dividend(&raw("ABC", 0.50, "2024-01-15T00:00:00"), "US")
            .await
            .unwrap();

        let mut later = raw("ABC", 0.55, "2024-02-15T00:00:00");
        later.name = String::new();
        let added = service.add_dividend(&later, "Atlantis").await.unwrap();
        assert_eq!(added.ignored_issues, 1);

        let stored = service.store().find("ABC").await.unwrap().unwrap();
        assert_eq!(stored.currency, "USD");
        assert_eq!(stored.name, "ABC Corp");
        assert_eq!(stored.dividend_yield, 0.04);
        assert_eq!(stored.dividend_history.len(), 2);
    }

    #[tokio::test]
    async fn empty_ticker_is_not_written() {
        let service = DividendService::new(Arc::new(MemoryStore::new()), "1.0.0");
        let err = service
            .add_dividend(&raw("  ", 0.50, "2024-01-15T00:00:00"), "US")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FieldParse);
        assert_eq!(service.store().writes(), 0);
        assert!(service.store().records().await.is_empty());
    }

    /// Reports a conflict for the first `conflicts` writes, then delegates.
    struct Contended {
        inner: MemoryStore,
        conflicts: AtomicUsize,
    }

    #[async_trait]
    impl HistoryStore for Contended {
        async fn find(&self, ticker: &str) -> SpiderResult<Option<TickerHistory>> {
            self.inner.find(ticker).await
        }

        async fn upsert(&self, history: &TickerHistory) -> SpiderResult<Upsert> {
            let left = self.conflicts.load(Ordering::SeqCst);
            if left > 0 {
                self.conflicts.store(left - 1, Ordering::SeqCst);
                return Ok(Upsert::Conflict);
            }
            self.inner.upsert(history).await
        }
    }

    #[tokio::test]
    async fn conflict_is_retried_once() {
        let store = Arc::new(Contended {
            inner: MemoryStore::new(),
            conflicts: AtomicUsize::new(1),
        });
        let service = DividendService::new(store.clone(), "1.0.0");
        let added = service
            .add_dividend(&raw("ABC", 0.50, "2024-01-15T00:00:00"), "US")
            .await
            .unwrap();
        assert_eq!(added.upsert, Upsert::Inserted { revision: 0 });

        store.conflicts.store(2, Ordering::SeqCst);
        let err = service
            .add_dividend(&raw("ABC", 0.55, "2024-02-15T00:00:00"), "US")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(store.inner.writes(), 1);
    }
}
