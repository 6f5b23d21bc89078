//! CLI entrypoint for display-tool.

mod cli;
mod inspect;
mod run;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use display_model::DisplayConfig;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    if let Err(err) = execute(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => DisplayConfig::load(path)
            .with_context(|| format!("load configuration {}", path.display()))?,
        None => DisplayConfig::default(),
    };
    init_logging(&config, cli.verbose);
    match cli.command {
        Command::Check { file } => inspect::check(&file, &config),
        Command::Show { file, properties } => inspect::show(&file, &config, properties),
        Command::Normalize { file, output } => inspect::normalize(&file, output.as_deref()),
        Command::Run {
            file,
            seeds,
            writes,
            duration_ms,
        } => run::run(
            &config,
            &run::RunOptions {
                file,
                seeds,
                writes,
                duration: duration_ms.map(Duration::from_millis),
            },
        ),
    }
}

/// `RUST_LOG` wins over the configured level; `--verbose` raises the
/// configured level to debug.
fn init_logging(config: &DisplayConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.log.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
