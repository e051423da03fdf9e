use divvy_spider::config::{SpiderConfig, StoreConfig};
use divvy_spider::service::DividendService;
use divvy_spider::store::PgStore;
use divvy_spider::tiprank::{JobMode, Scraper};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Connect to the dividend history table and build the scraper around it.
pub(crate) async fn build(tui: bool) -> anyhow::Result<Scraper<PgStore>> {
    trace!("reading configuration ...");
    let spider_config = SpiderConfig::from_env()?;
    let store_config = StoreConfig::from_env()?;

    trace!("connecting to the dividend history store ...");
    let store = PgStore::connect(&store_config).await.map_err(|err| {
        error!("dividend history store connection error: {err}");
        err
    })?;
    store.create_table().await?;
    debug!("dividend history store connection established");

    let service = DividendService::new(Arc::new(store), store_config.schema_version);
    Ok(Scraper::new(&spider_config, service, tui)?)
}

/// Run each job mode in turn.
pub(crate) async fn run(jobs: Vec<JobMode>, tui: bool) -> anyhow::Result<()> {
    let scraper = build(tui).await?;

    let time = std::time::Instant::now();
    for job in jobs {
        let report = scraper.run(job).await?;
        if !report.is_clean() {
            warn!(
                job = %job,
                failed = ?report.failed,
                transport_failures = report.transport_failures,
                decode_failures = report.decode_failures,
                "job finished with failures"
            );
        }

        if tui {
            println!(
                "{job} ... done ({} tickers, {} failures)",
                report.processed.len(),
                report.failed.len() + report.transport_failures + report.decode_failures
            );
        }
    }

    info!(
        "spider finished collecting data, time elapsed: {:?}",
        time.elapsed()
    );

    Ok(())
}
