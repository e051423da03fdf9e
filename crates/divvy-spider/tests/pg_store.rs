use chrono::{TimeZone, Utc};
use divvy_spider::config::{StoreConfig, TIPRANK_DIVIDEND_LIST_COLLECTION};
use divvy_spider::model::{DividendPoint, TickerHistory};
use divvy_spider::store::{HistoryStore, PgStore, Upsert};
use dotenv::var;
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use tokio_postgres::{self as pg, NoTls};

// Round trip against a live database; skipped when DIVIDEND_DB_URL is unset.

fn point(y: i32, m: u32, d: u32, dividend: f64) -> (i64, DividendPoint) {
    let ex = Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap();
    (
        ex.timestamp(),
        DividendPoint {
            dividend,
            ex_dividend_date: Some(ex),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn upsert_checks_revision() {
    let Ok(url) = var("DIVIDEND_DB_URL") else {
        println!("DIVIDEND_DB_URL not set, skipping");
        return;
    };
    let table = format!("divvy_test_{}", rand::thread_rng().gen_range(0..1_000_000u32));

    let config = StoreConfig {
        url: url.clone(),
        min_pool_size: 1,
        max_pool_size: 2,
        idle_timeout: Some(Duration::from_secs(60)),
        op_timeout: Duration::from_secs(10),
        schema_version: "1.0.0".to_string(),
        colnames: HashMap::from([(
            TIPRANK_DIVIDEND_LIST_COLLECTION.to_string(),
            table.clone(),
        )]),
    };
    let store = PgStore::connect(&config).await.unwrap();
    store.create_table().await.unwrap();

    assert!(store.find("ABC").await.unwrap().is_none());

    let mut fresh = TickerHistory {
        ticker: "abc".to_string(),
        name: "ABC Corp".to_string(),
        dividend_yield: 0.04,
        currency: "USD".to_string(),
        schema: "1.0.0".to_string(),
        enabled: true,
        ..Default::default()
    };
    fresh.dividend_history.extend([point(2024, 1, 15, 0.50)]);
    assert_eq!(
        store.upsert(&fresh).await.unwrap(),
        Upsert::Inserted { revision: 0 }
    );

    // a second writer that never saw the first insert
    assert_eq!(store.upsert(&fresh).await.unwrap(), Upsert::Conflict);

    let mut stored = store.find("ABC").await.unwrap().unwrap();
    assert_eq!(stored.ticker, "ABC");
    assert_eq!(stored.revision, Some(0));
    let created_at = stored.created_at;

    stored.dividend_history.extend([point(2024, 2, 15, 0.55)]);
    assert_eq!(
        store.upsert(&stored).await.unwrap(),
        Upsert::Updated { revision: 1 }
    );

    let stored = store.find("abc").await.unwrap().unwrap();
    assert_eq!(stored.revision, Some(1));
    assert_eq!(stored.created_at, created_at);
    assert_eq!(stored.dividend_history.len(), 2);
    assert_eq!(stored.dividend_history[&point(2024, 1, 15, 0.0).0].dividend, 0.50);
    assert_eq!(stored.dividend_history[&point(2024, 2, 15, 0.0).0].dividend, 0.55);

    // -- CLEAN UP --
    let (client, conn) = pg::connect(&url, NoTls).await.unwrap();
    tokio::spawn(async move {
        if let Err(err) = conn.await {
            panic!("dividend db connection error: {}", err)
        }
    });
    client
        .batch_execute(&format!("DROP TABLE {table}"))
        .await
        .unwrap();
}
