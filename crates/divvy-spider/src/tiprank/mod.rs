//! Dividend schedules from the [TipRanks] `getByDate` endpoint.
//!
//! [TipRanks]: https://www.tipranks.com/dividends/calendar

/// Fetch targets for each job mode.
pub mod plan;

/// Rate-limited, per-target isolated HTTP requests.
pub mod fetch;

/// Response decoding and record normalization.
pub mod de;

/// Non-destructive merging of dividend histories.
pub mod merge;

/// Job driver: plan -> fetch -> store, with a report of every outcome.
pub mod scrape;

pub use plan::{FetchTarget, JobMode};
pub use scrape::{JobReport, Scraper};
