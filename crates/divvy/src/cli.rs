use clap::{Parser, Subcommand, ValueEnum};
use divvy_spider::tiprank::JobMode;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sets the level of tracing.
    #[arg(short, long, global = true)]
    pub trace: Option<TraceLevel>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scrape TipRanks dividend schedules into the dividend history table.
    Spider {
        /// Specify the jobs to run, in order.
        ///
        /// If no jobs are provided, spider runs next-week then previous-year.
        #[arg(short, long, value_delimiter = ',')]
        jobs: Option<Vec<Job>>,
    },

    /// Run a single daily cycle and print the processed tickers as JSON.
    Invoke,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
#[clap(rename_all = "UPPERCASE")]
pub enum TraceLevel {
    DEBUG,
    ERROR,
    INFO,
    TRACE,
    WARN,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Job {
    /// Today only.
    SingleDay,

    /// Today and the previous 7 days.
    PreviousWeek,

    /// Today and the next 7 days.
    NextWeek,

    /// Today and the previous 365 days.
    PreviousYear,

    /// The day one week from today.
    Daily,
}

impl From<Job> for JobMode {
    fn from(job: Job) -> Self {
        match job {
            Job::SingleDay => JobMode::SingleDay,
            Job::PreviousWeek => JobMode::PreviousWeek,
            Job::NextWeek => JobMode::NextWeek,
            Job::PreviousYear => JobMode::PreviousYear,
            Job::Daily => JobMode::Daily,
        }
    }
}
