mod cli;
mod commands;
mod config;
mod paths;
mod ui;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use std::path::PathBuf;

/// Exit code when the executor itself fails before a run can be reported
const INTERNAL_ERROR: i32 = -2;

/// Global context for the application
pub struct Context {
    /// Default package directory; holds the sandbox and the config file
    pub package_dir: PathBuf,
    /// Directory for run logs without an explicit `log:` path
    pub log_dir: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            ui::error(&format!("{e:#}"));
            INTERNAL_ERROR
        }
    };

    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<i32> {
    let package_dir = paths::package_dir(cli.package_dir.as_deref())?;
    let ctx = Context {
        log_dir: paths::log_dir(&package_dir),
        package_dir,
    };

    commands::run::run(&ctx, &cli.args)
}
