use crate::spider;
use divvy_spider::tiprank::{JobMode, JobReport};
use tracing::{info, warn};

/// One invocation: a single daily cycle. Returns the tickers that were written.
pub(crate) async fn invoke() -> anyhow::Result<Vec<String>> {
    info!("handler is called");

    let scraper = spider::build(false).await?;
    let report = scraper.run(JobMode::Daily).await?;

    outcome(report)
}

/// A cycle where nothing could be fetched at all is an error; partial failures are logged and
/// the processed tickers are still returned.
fn outcome(report: JobReport) -> anyhow::Result<Vec<String>> {
    if report.targets > 0 && report.responses == 0 {
        anyhow::bail!(
            "no usable response for {} targets ({} transport, {} decode failures)",
            report.targets,
            report.transport_failures,
            report.decode_failures
        );
    }

    if !report.failed.is_empty() {
        warn!(failed = ?report.failed, "some tickers could not be written");
    }

    Ok(report.processed)
}
