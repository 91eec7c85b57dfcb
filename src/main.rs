//! Entry point. Parses the CLI, configures logging, dispatches to the
//! selected subcommand protocol, and reports any error on a single stderr
//! line before exiting 1 — matching the teacher's plain, un-decorated
//! failure reporting rather than a backtrace or debug dump.

use anyhow::Context;
use clap::Parser;

use mistletoe::cli::Cli;
use mistletoe::commands;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose() { log::LevelFilter::Debug } else { log::LevelFilter::Warn };
    env_logger::Builder::new().filter_level(level).format_timestamp(None).init();

    let cwd = std::env::current_dir().context("failed to read current directory")?;

    if let Err(err) = commands::dispatch(cli, &cwd) {
        let prefix = err.repo().unwrap_or("mistletoe");
        eprintln!("{prefix}: {}: {err}", err.kind());
        std::process::exit(1);
    }

    Ok(())
}
