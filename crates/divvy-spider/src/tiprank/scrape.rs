use super::de::decode;
use super::fetch::Fetcher;
use super::plan::{plan, FetchTarget, JobMode};
use crate::config::SpiderConfig;
use crate::error::{ErrorKind, SpiderResult};
use crate::model::TickerHistory;
use crate::service::DividendService;
use crate::store::HistoryStore;
use crate::tui::Progress;
use chrono::{NaiveDate, Utc};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::{error, info, info_span, Instrument};

/// Sent by every response handler to the job's collector.
#[derive(Debug)]
enum Outcome {
    Transport,
    Decode,
    Response { records: usize },
    Added { ticker: String },
    Failed { ticker: String, kind: ErrorKind },
}

/// Aggregate of one job run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JobReport {
    pub targets: usize,
    pub responses: usize,
    pub records: usize,
    pub transport_failures: usize,
    pub decode_failures: usize,
    /// Tickers written at least once, in first-seen order.
    pub processed: Vec<String>,
    /// Tickers whose write failed, with the failure kind.
    pub failed: Vec<(String, ErrorKind)>,
}

impl JobReport {
    fn record(&mut self, outcome: Outcome, seen: &mut HashSet<String>) {
        match outcome {
            Outcome::Transport => self.transport_failures += 1,
            Outcome::Decode => self.decode_failures += 1,
            Outcome::Response { records } => {
                self.responses += 1;
                self.records += records;
            }
            Outcome::Added { ticker } => {
                if seen.insert(ticker.clone()) {
                    self.processed.push(ticker);
                }
            }
            Outcome::Failed { ticker, kind } => self.failed.push((ticker, kind)),
        }
    }

    /// Every target was fetched and decoded, and every record was written.
    pub fn is_clean(&self) -> bool {
        self.transport_failures == 0 && self.decode_failures == 0 && self.failed.is_empty()
    }
}

/// Runs TipRanks dividend jobs: plan, fetch, then decode and store every response.
pub struct Scraper<S> {
    fetcher: Fetcher,
    service: DividendService<S>,
    countries: Vec<String>,
    tui: bool,
}

impl<S: HistoryStore> Scraper<S> {
    pub fn new(config: &SpiderConfig, service: DividendService<S>, tui: bool) -> SpiderResult<Self> {
        Ok(Self {
            fetcher: Fetcher::new(config)?,
            service,
            countries: config.countries.clone(),
            tui,
        })
    }

    pub fn service(&self) -> &DividendService<S> {
        &self.service
    }

    /// Run `mode` relative to the current UTC date.
    pub async fn run(&self, mode: JobMode) -> anyhow::Result<JobReport> {
        self.run_on(mode, Utc::now().date_naive()).await
    }

    /// Run `mode` relative to `today`; blocks until every planned target is done.
    pub async fn run_on(&self, mode: JobMode, today: NaiveDate) -> anyhow::Result<JobReport> {
        let time = std::time::Instant::now();
        let targets = plan(mode, &self.countries, today);
        info!(job = %mode, targets = targets.len(), "scraping TipRank dividends");

        // a single collector owns the report; handlers only send
        let (tx, mut rx) = mpsc::unbounded_channel::<Outcome>();
        let collector = tokio::spawn({
            let targets = targets.len();
            async move {
                let mut report = JobReport {
                    targets,
                    ..Default::default()
                };
                let mut seen = HashSet::new();
                while let Some(outcome) = rx.recv().await {
                    report.record(outcome, &mut seen);
                }
                report
            }
        });

        let progress = Progress::new(targets.len(), &mode.to_string(), self.tui)?;
        self.fetcher
            .fetch_all(targets, |target, body| {
                let tx = tx.clone();
                let progress = &progress;
                let span = info_span!("response", country = %target.country, date = %target.date);
                async move {
                    let ok = self.handle_response(&target, body, &tx).await;
                    if ok {
                        progress.success();
                    } else {
                        progress.fail();
                    }
                }
                .instrument(span)
            })
            .await;
        progress.finish();

        drop(tx);
        let report = collector.await?;

        info!(
            job = %mode,
            responses = report.responses,
            records = report.records,
            processed = report.processed.len(),
            failed = report.failed.len(),
            transport_failures = report.transport_failures,
            decode_failures = report.decode_failures,
            "DONE - SCRAPING TIPRANK DIVIDENDS, time elapsed: {:?}",
            time.elapsed()
        );

        Ok(report)
    }

    /// Decode one response and add every record in it. Returns whether the response itself
    /// was usable; individual record failures are reported through `tx`.
    async fn handle_response(
        &self,
        target: &FetchTarget,
        body: SpiderResult<Vec<u8>>,
        tx: &mpsc::UnboundedSender<Outcome>,
    ) -> bool {
        // send only fails once the collector is gone, and it outlives every handler
        let send = |outcome: Outcome| {
            let _ = tx.send(outcome);
        };

        let body = match body {
            Ok(body) => body,
            Err(_) => {
                send(Outcome::Transport);
                return false;
            }
        };

        let records = match decode(&body) {
            Ok(records) => records,
            Err(err) => {
                error!(error = %err, "unmarshal response failed");
                send(Outcome::Decode);
                return false;
            }
        };
        send(Outcome::Response {
            records: records.len(),
        });

        for raw in &records {
            match self.service.add_dividend(raw, &target.country).await {
                Ok(added) => send(Outcome::Added {
                    ticker: added.ticker,
                }),
                Err(err) => {
                    error!(ticker = %raw.ticker, error = %err, "add TipRank dividend failed");
                    send(Outcome::Failed {
                        ticker: TickerHistory::storage_key(&raw.ticker),
                        kind: err.kind(),
                    });
                }
            }
        }

        true
    }
}
