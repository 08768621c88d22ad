//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(name = "reportrag")]
#[command(about = "Ask questions about quarterly reports stored in a Pinecone index")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: configured level)
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer a question from the reports of one period
    Ask {
        #[command(flatten)]
        query: QueryArgs,
        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the ranked chunks for a question without generating an answer
    Search {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Show vector index statistics
    Stats,
    /// List vector ids grouped by reporting period
    ListIds {
        /// Only list ids starting with this prefix (e.g. 2022_Q2_)
        #[arg(long)]
        prefix: Option<String>,
        /// Write the grouping to a JSON file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show current configuration
    Config,
}

/// Question plus the period to search in
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// The question
    pub query: String,
    /// Fiscal year metadata value (matched exactly as typed)
    #[arg(long)]
    pub year: Option<String>,
    /// Quarter metadata value (matched exactly as typed); repeat or comma-separate for several
    #[arg(long, value_delimiter = ',')]
    pub quarter: Vec<String>,
    /// Number of chunks to retrieve (default: retrieval.default_top_k)
    #[arg(short = 'k', long, allow_negative_numbers = true)]
    pub top_k: Option<i64>,
}
