mod cli;
mod pipeline;

use clap::Parser;
use cli::{Cli, TraceLevel};
use rivalry_pipeline::config::Config;
use rivalry_pipeline::store::ArtifactStore;
use tracing::{subscriber, trace, Level};
use tracing_subscriber::FmtSubscriber;

////////////////////////////////////////////////////////////////////////////

// preprocess the trace level, and open the .env file
fn preprocess(trace_level: Level) {
    dotenv::dotenv().ok();
    let my_subscriber = FmtSubscriber::builder()
        .with_max_level(trace_level)
        .finish();
    subscriber::set_global_default(my_subscriber).expect("Set subscriber");
}

////////////////////////////////////////////////////////////////////////////

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    preprocess(match cli.trace {
        Some(TraceLevel::DEBUG) => Level::DEBUG,
        Some(TraceLevel::ERROR) => Level::ERROR,
        Some(TraceLevel::TRACE) => Level::TRACE,
        Some(TraceLevel::WARN) => Level::WARN,
        Some(TraceLevel::INFO) | None => Level::INFO,
    });
    trace!("command line input recorded: {cli:?}");

    let cfg = Config::from_env();
    let store = ArtifactStore::new(&cfg.data_dir);

    use cli::Commands::*;
    match cli.command {
        Download { company, year } => {
            pipeline::download(&cfg, &store, company.as_deref(), year, cli.force).await?
        }
        ExtractDates => pipeline::extract_dates(&cfg, &store, cli.force).await?,
        ExtractMentions => pipeline::extract_mentions(&cfg, &store, cli.force).await?,
        Analyze => pipeline::analyze(&cfg, &store, cli.force).await?,
        Run => pipeline::run_all(&cfg, &store, cli.force).await?,
    }

    Ok(())
}
