//! Firmex CLI - Command-line utility for selective firmware artifact
//! extraction.

mod cli;
mod commands;
mod error;
mod output;
mod progress;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::LogFormat;

fn init_tracing(verbose: bool, quiet: bool, format: LogFormat) {
    let default_level = if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);

    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
}

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    init_tracing(cli.verbose, cli.quiet, cli.log_format);

    let formatter = output::formatter_for(&cli);

    let result = match &cli.command {
        cli::Commands::Extract(args) => {
            commands::extract::execute(args, &*formatter, !cli.quiet && !cli.json)
        }
        cli::Commands::Completion(args) => {
            commands::completion::execute(args.shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            formatter.render_error(&err);
            ExitCode::FAILURE
        }
    }
}
