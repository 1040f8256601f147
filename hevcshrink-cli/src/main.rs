// hevcshrink-cli/src/main.rs
//
// Entry point for the `hevcshrink` binary.
//
// Parses the command line, dispatches to the subcommand and maps the result
// onto the process exit code: 0 when a run completed (per-file failures and
// a cancelled batch are part of a completed run) or was declined at the
// confirmation prompt, 1 on input or other fatal errors.

use clap::Parser;
use hevcshrink_cli::terminal;
use hevcshrink_cli::{Cli, Commands, RunOptions, run_encode, run_encoders};
use owo_colors::OwoColorize;
use std::process;

fn main() {
    let cli = Cli::parse();
    let options = RunOptions {
        verbose: cli.verbose,
        color: terminal::init_color(cli.no_color),
    };

    let result = match cli.command {
        Commands::Encode(args) => run_encode(args, options).map(|summary| {
            if let Some(summary) = summary {
                log::debug!(
                    "{} encoded, {} skipped, {} failed",
                    summary.encoded,
                    summary.skipped,
                    summary.failed
                );
            }
        }),
        Commands::Encoders => run_encoders(options),
    };

    if let Err(e) = result {
        if options.color {
            eprintln!("{} {}", "Error:".red().bold(), e);
        } else {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}
