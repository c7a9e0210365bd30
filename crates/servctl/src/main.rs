//! servctl - lifecycle manager for a locally-run Rack application server
//!
//! Subcommands:
//! - start: start the application server (foreground or daemonized)
//! - stop: stop a daemonized server via its pid file
//! - rake: execute rake tasks in the application environment
//! - console: boot the interactive application console
//! - generate: run the code generator
//! - runner: run a piece of code in the application environment
//! - version: show the servctl version

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    servctl::cli::run(std::env::args_os())
}
