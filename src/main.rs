//! Binary entry point for locale-overlay.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::Parser;
use locale_overlay::cli::output::{OutputFormat, format_error};
use locale_overlay::cli::{Cli, execute};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "LOCALE_OVERLAY_LOG";

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("locale_overlay=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let format = OutputFormat::parse(&cli.format);

    match execute(&cli) {
        Ok(output) => {
            if !output.is_empty() {
                // Handle broken pipe gracefully (e.g., when piped to `head` or `jq`)
                if let Err(e) = write!(io::stdout(), "{output}")
                    && e.kind() != io::ErrorKind::BrokenPipe
                {
                    eprintln!("Error writing to stdout: {e}");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let error_output = format_error(&e, format);
            match format {
                // JSON errors go to stdout for programmatic parsing
                OutputFormat::Json => print!("{error_output}"),
                OutputFormat::Text => eprintln!("Error: {error_output}"),
            }
            ExitCode::FAILURE
        }
    }
}
