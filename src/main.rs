//! Kilde CLI entry point.

use anyhow::Result;
use clap::Parser;
use kilde::cli::{commands, Cli, Commands};
use kilde::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::load_from(cli.config.as_ref().map(PathBuf::from).as_ref())?;
    std::fs::create_dir_all(settings.data_dir())?;

    match &cli.command {
        Commands::Index { rebuild } => commands::run_index(*rebuild, settings).await,
        Commands::Ask { question } => commands::run_ask(question, settings).await,
        Commands::Search { query, limit } => commands::run_search(query, *limit, settings).await,
        Commands::Stats => commands::run_stats(settings).await,
        Commands::Config { action } => commands::run_config(action, settings),
    }
}

/// RUST_LOG wins when set; otherwise -v flags map onto the crate's own level.
fn init_tracing(verbosity: u8) {
    let fallback = match verbosity {
        0 => "kilde=warn",
        1 => "kilde=info",
        2 => "kilde=debug",
        _ => "kilde=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
