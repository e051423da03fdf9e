mod cli;
mod handler;
mod spider;

// remote imports
use clap::Parser;
use cli::{Cli, TraceLevel};
use divvy_spider::tiprank::JobMode;
use tracing::{subscriber, trace, Level};
use tracing_subscriber::FmtSubscriber;

////////////////////////////////////////////////////////////////////////////

// preproccess the trace level
fn preprocess(trace_level: Level) {
    let my_subscriber = FmtSubscriber::builder()
        .with_max_level(trace_level)
        .finish();
    subscriber::set_global_default(my_subscriber).expect("Set subscriber");
}

////////////////////////////////////////////////////////////////////////////

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // set the trace level
    if let Some(trace_level) = cli.trace {
        preprocess(match trace_level {
            TraceLevel::DEBUG => Level::DEBUG,
            TraceLevel::ERROR => Level::ERROR,
            TraceLevel::INFO => Level::INFO,
            TraceLevel::TRACE => Level::TRACE,
            TraceLevel::WARN => Level::WARN,
        });
    }
    trace!("command line input recorded: {cli:?}");

    // if no trace level provided, use tui
    let tui = cli.trace.is_none();

    // read cli inputs
    use cli::Commands::*;
    match cli.command {
        // `divvy spider <Option<Vec<Job>>>`: run jobs in order
        Spider { jobs } => {
            // if no jobs provided, run the weekly lookahead and the yearly backfill
            let jobs = match jobs {
                Some(jobs) => jobs.into_iter().map(JobMode::from).collect(),
                None => vec![JobMode::NextWeek, JobMode::PreviousYear],
            };
            spider::run(jobs, tui).await?;
        }

        // `divvy invoke`: one daily cycle, result on stdout
        Invoke => {
            let processed = handler::invoke().await?;
            println!("{}", serde_json::to_string(&processed)?);
        }
    }

    Ok(())
}
