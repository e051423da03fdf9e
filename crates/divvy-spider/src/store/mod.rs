use crate::error::SpiderResult;
use crate::model::TickerHistory;
use async_trait::async_trait;

mod sql;

/// In-process store with the same upsert semantics as [`PgStore`]; used for dry runs and tests.
pub mod memory;

/// PostgreSQL-backed store, pooled with [deadpool-postgres].
///
/// [deadpool-postgres]: https://docs.rs/deadpool-postgres
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Result of a conditional write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upsert {
    /// No record existed; a new one was created with a fresh creation timestamp.
    Inserted { revision: i64 },
    /// The stored record matched the expected revision and was replaced.
    Updated { revision: i64 },
    /// The stored revision differs from the expected one; nothing was written.
    Conflict,
}

/// Persistence of [`TickerHistory`] records, keyed by uppercased ticker.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Read the stored record, if any.
    async fn find(&self, ticker: &str) -> SpiderResult<Option<TickerHistory>>;

    /// Write `history` in one conditional operation.
    ///
    /// `history.revision` is the revision the caller read (`None` when nothing was stored).
    /// Insert-on-absent sets `created_at`; replace-on-match keeps the stored `created_at` and
    /// stamps `modified_at`.
    async fn upsert(&self, history: &TickerHistory) -> SpiderResult<Upsert>;
}
