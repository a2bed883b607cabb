//! waymap - persistent route graph CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use waymap::cli;
use waymap::config::UserConfig;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let config = UserConfig::load();

    // Initialize logging (stderr, so stdout stays parseable)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli::effective_log_level(&cli, &config)));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    cli::run(cli, config)
}
