mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod progress;
mod resource;
mod schema;
mod sudo;
mod ui;
mod users;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Recipes file given with --config or HOSTSTATE_CONFIG
    pub config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
    };

    match cli.command {
        Command::Status(args) => commands::status::run(&ctx, args),
        Command::Diff(args) => commands::diff::run(&ctx, args),
        Command::Apply(args) => commands::apply::run(&ctx, args),
        Command::Recipes => commands::recipes::run(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "hoststate", &mut io::stdout());
            Ok(())
        }
    }
}
