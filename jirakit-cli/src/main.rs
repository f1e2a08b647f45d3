mod cli_args;
mod commands;
mod telemetry;
mod utils;

use std::{io, process::ExitCode};

use anyhow::Result;
use clap::Parser;

use crate::cli_args::Cli;

fn main() -> ExitCode {
    telemetry::init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failures) => {
            eprintln!("{failures} item(s) failed");
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<usize> {
    let session = commands::load_session(&cli.global)?;
    let stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    commands::execute(&session, cli.command, stdin, &mut stdout)
}
