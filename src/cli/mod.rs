//! CLI module for Kilde.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Kilde - Grounded Question Answering
///
/// A local-first CLI tool for indexing PDF documents and video transcripts
/// and asking questions with cited answers. The name "Kilde" comes from the
/// Norwegian/Scandinavian word for "source."
#[derive(Parser, Debug)]
#[command(name = "kilde")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Read configuration from this file instead of the default location
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build or update the search index from the corpus directories
    Index {
        /// Rebuild each domain from scratch instead of updating in place
        #[arg(short, long)]
        rebuild: bool,
    },

    /// Ask a question and get a cited answer from the indexed corpus
    Ask {
        /// Natural-language question to answer
        question: String,
    },

    /// Search for relevant chunks without generating an answer
    Search {
        /// Query text for hybrid retrieval
        query: String,

        /// How many fused results to show
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Show index statistics per domain and source
    Stats,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,

    /// Print where the configuration file is read from
    Path,
}
