use super::sql::Statements;
use super::{HistoryStore, Upsert};
use crate::config::{StoreConfig, TIPRANK_DIVIDEND_LIST_COLLECTION};
use crate::error::{SpiderError, SpiderResult};
use crate::model::{DividendPoint, ExDividendKey, TickerHistory};
use async_trait::async_trait;
use deadpool_postgres::{ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_postgres::types::Json;
use tokio_postgres::{NoTls, Row};
use tracing::{debug, error, trace};

pub struct PgStore {
    pool: Pool,
    statements: Statements,
    op_timeout: Duration,
    reaper: Option<JoinHandle<()>>,
}

impl PgStore {
    /// Build the connection pool for the dividend-history table named in `config`.
    pub async fn connect(config: &StoreConfig) -> SpiderResult<Self> {
        let table = config.colname(TIPRANK_DIVIDEND_LIST_COLLECTION).map_err(|err| {
            error!("cannot find collection name, error({err})");
            err
        })?;

        trace!("creating postgres connection pool config");
        let mut pg_config = deadpool_postgres::Config::new();
        pg_config.url = Some(config.url.clone());
        pg_config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        pg_config.pool = Some(PoolConfig::new(config.max_pool_size.max(1)));

        let pool = pg_config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|err| SpiderError::Config(format!("failed to create pool: {err}")))?;

        // open the minimum number of connections up front; they return to the pool on drop
        let min = config.min_pool_size.min(config.max_pool_size.max(1));
        if min > 0 {
            let warm = futures::future::try_join_all((0..min).map(|_| pool.get())).await?;
            debug!("{} connections opened", warm.len());
        }

        let reaper = config
            .idle_timeout
            .map(|idle| spawn_reaper(pool.clone(), idle, min));

        debug!(table, "dividend history pool established");
        Ok(Self {
            pool,
            statements: Statements::for_table(table),
            op_timeout: config.op_timeout,
            reaper,
        })
    }

    /// Create the history table if it does not exist yet.
    pub async fn create_table(&self) -> SpiderResult<()> {
        self.timed("create table", async {
            let client = self.pool.get().await?;
            client.batch_execute(&self.statements.create).await?;
            Ok(())
        })
        .await
    }

    async fn timed<T, F>(&self, op: &str, fut: F) -> SpiderResult<T>
    where
        F: Future<Output = SpiderResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(SpiderError::StorageTimeout(format!(
                "{op} exceeded {:?}",
                self.op_timeout
            ))),
        }
    }
}

impl Drop for PgStore {
    fn drop(&mut self) {
        if let Some(reaper) = &self.reaper {
            reaper.abort();
        }
    }
}

/// Periodically close connections that have sat idle for longer than `idle`, never taking the
/// pool below `min` connections.
fn spawn_reaper(pool: Pool, idle: Duration, min: usize) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval((idle / 2).max(Duration::from_secs(1)));
        loop {
            interval.tick().await;
            let surplus = Cell::new(pool.status().size.saturating_sub(min));
            pool.retain(|_, metrics| keep(&surplus, metrics.last_used(), idle));
        }
    })
}

/// Whether a connection idle for `idle_for` survives; each one closed uses up one `surplus`.
fn keep(surplus: &Cell<usize>, idle_for: Duration, idle: Duration) -> bool {
    if idle_for < idle || surplus.get() == 0 {
        return true;
    }
    surplus.set(surplus.get() - 1);
    false
}

fn history_from_row(row: &Row) -> SpiderResult<TickerHistory> {
    let dividend_history: Json<BTreeMap<ExDividendKey, DividendPoint>> = row.try_get(10)?;
    Ok(TickerHistory {
        ticker: row.try_get(0)?,
        name: row.try_get(1)?,
        dividend_yield: row.try_get(2)?,
        currency: row.try_get(3)?,
        schema: row.try_get(4)?,
        enabled: row.try_get(5)?,
        deleted: row.try_get(6)?,
        created_at: Some(row.try_get(7)?),
        modified_at: row.try_get(8)?,
        revision: Some(row.try_get(9)?),
        dividend_history: dividend_history.0,
    })
}

#[async_trait]
impl HistoryStore for PgStore {
    async fn find(&self, ticker: &str) -> SpiderResult<Option<TickerHistory>> {
        let ticker = TickerHistory::storage_key(ticker);
        self.timed("find", async {
            let client = self.pool.get().await?;
            let stmt = client.prepare_cached(&self.statements.select).await?;
            match client.query_opt(&stmt, &[&ticker]).await? {
                Some(row) => history_from_row(&row).map(Some),
                None => {
                    trace!(ticker = %ticker, "dividend history not found");
                    Ok(None)
                }
            }
        })
        .await
    }

    async fn upsert(&self, history: &TickerHistory) -> SpiderResult<Upsert> {
        let ticker = TickerHistory::storage_key(&history.ticker);
        let now = chrono::Utc::now().timestamp();
        let expected = history.revision.unwrap_or(-1);

        self.timed("upsert", async {
            let client = self.pool.get().await?;
            let stmt = client.prepare_cached(&self.statements.upsert).await?;
            let row = client
                .query_opt(
                    &stmt,
                    &[
                        &ticker,
                        &history.name,
                        &history.dividend_yield,
                        &history.currency,
                        &history.schema,
                        &history.enabled,
                        &history.deleted,
                        &now,
                        &Json(&history.dividend_history),
                        &expected,
                    ],
                )
                .await?;

            Ok(match row {
                None => Upsert::Conflict,
                Some(row) => match row.try_get::<_, i64>(0)? {
                    0 => Upsert::Inserted { revision: 0 },
                    revision => Upsert::Updated { revision },
                },
            })
        })
        .await
    }
}
