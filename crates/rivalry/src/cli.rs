use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sets the level of tracing.
    #[arg(short, long, global = true)]
    pub trace: Option<TraceLevel>,

    /// Recompute a stage even when its output artifact already exists.
    #[arg(short, long, global = true)]
    pub force: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download SEC annual filings and stock price histories.
    Download {
        /// Restrict the download to one ticker.
        #[arg(short, long)]
        company: Option<String>,

        /// Restrict the filing download to one filing year.
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Parse downloaded filings into the filing-dates artifact.
    ExtractDates,

    /// Ask the completion endpoint which competitors each filing mentions.
    ExtractMentions,

    /// Join dates, mentions and returns, and run the regression.
    Analyze,

    /// Run every stage in dependency order.
    Run,
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
