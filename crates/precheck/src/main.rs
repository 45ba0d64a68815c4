//! precheck - Pre-commit checks runner
//!
//! Formats the tree, then runs clippy, a feature-powerset check and the test
//! suite, stopping at the first check that fails. Projects can replace the
//! built-in steps with a `.precheck.yaml`.

mod cli;
mod config;
mod error;
mod hook;
mod pipeline;
mod record;
mod runner;

use clap::Parser;
use colored::Colorize;
use precheck_core::Paths;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Steps run one after another; the runtime only drives child processes
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{} failed to start runtime: {}", "ERROR:".red(), e);
            return ExitCode::from(cli::EXIT_USAGE);
        }
    };

    match rt.block_on(cli::run(cli, &Paths::new())) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", "ERROR:".red(), e);
            ExitCode::from(cli::EXIT_USAGE)
        }
    }
}
