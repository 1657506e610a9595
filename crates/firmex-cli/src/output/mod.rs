//! Rendering of extraction reports and failures.
//!
//! Human output writes the report to stdout and diagnostics to stderr.
//! With `--json` the report or the error becomes one JSON document on stdout.

mod formatter;
mod human;
mod json;

pub use formatter::OutputFormatter;

use crate::cli::Cli;
use human::HumanFormatter;
use json::JsonFormatter;

/// Picks the renderer selected by the global output flags.
pub fn formatter_for(cli: &Cli) -> Box<dyn OutputFormatter> {
    if cli.json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter::new(cli.verbose, cli.quiet))
    }
}
