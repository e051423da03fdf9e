use super::{HistoryStore, Upsert};
use crate::error::SpiderResult;
use crate::model::TickerHistory;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, TickerHistory>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful (non-conflicting) writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of every stored record.
    pub async fn records(&self) -> HashMap<String, TickerHistory> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn find(&self, ticker: &str) -> SpiderResult<Option<TickerHistory>> {
        let key = TickerHistory::storage_key(ticker);
        Ok(self.records.lock().await.get(&key).cloned())
    }

    async fn upsert(&self, history: &TickerHistory) -> SpiderResult<Upsert> {
        let key = TickerHistory::storage_key(&history.ticker);
        let now = chrono::Utc::now().timestamp();
        let mut records = self.records.lock().await;

        let outcome = match records.get(&key) {
            None => {
                let mut record = history.clone();
                record.ticker = key.clone();
                record.created_at = Some(now);
                record.modified_at = now;
                record.revision = Some(0);
                records.insert(key, record);
                Upsert::Inserted { revision: 0 }
            }
            Some(stored) if stored.revision == history.revision => {
                let revision = stored.revision.unwrap_or(0) + 1;
                let mut record = history.clone();
                record.ticker = key.clone();
                record.created_at = stored.created_at;
                record.modified_at = now;
                record.revision = Some(revision);
                records.insert(key, record);
                Upsert::Updated { revision }
            }
            Some(_) => return Ok(Upsert::Conflict),
        };

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(ticker: &str, revision: Option<i64>) -> TickerHistory {
        TickerHistory {
            ticker: ticker.to_string(),
            name: "ABC Corp".to_string(),
            enabled: true,
            revision,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn insert_then_update() {
        let store = MemoryStore::new();
        assert_eq!(
            store.upsert(&history("abc", None)).await.unwrap(),
            Upsert::Inserted { revision: 0 }
        );

        let stored = store.find("ABC").await.unwrap().unwrap();
        assert_eq!(stored.ticker, "ABC");
        let created = stored.created_at;
        assert!(created.is_some());

        let mut next = stored.clone();
        next.name = "ABC Corporation".to_string();
        next.created_at = None;
        assert_eq!(
            store.upsert(&next).await.unwrap(),
            Upsert::Updated { revision: 1 }
        );

        let stored = store.find("abc").await.unwrap().unwrap();
        assert_eq!(stored.name, "ABC Corporation");
        assert_eq!(stored.created_at, created);
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn stale_revision_conflicts() {
        let store = MemoryStore::new();
        store.upsert(&history("ABC", None)).await.unwrap();

        // a second writer that also believed the ticker was new
        assert_eq!(
            store.upsert(&history("ABC", None)).await.unwrap(),
            Upsert::Conflict
        );
        assert_eq!(
            store.upsert(&history("ABC", Some(7))).await.unwrap(),
            Upsert::Conflict
        );
        assert_eq!(store.writes(), 1);
    }
}
