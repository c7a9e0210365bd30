//! Error taxonomy shared by all subcommands
//!
//! Every variant here is recovered at the dispatcher boundary and turned
//! into a single printed line plus a non-zero exit code. Malformed options
//! never reach this enum; clap reports those before any side effect is
//! applied.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by servctl subcommands
#[derive(Error, Debug)]
pub enum Error {
    // Preconditions checked by the prepare guard
    #[error("root directory '{}' does not exist", .0.display())]
    RootMissing(PathBuf),

    #[error("root directory '{}' is not accessible", .0.display())]
    RootInaccessible(PathBuf),

    #[error("boot file not found at {}/config/boot.rb", .0.display())]
    BootFileMissing(PathBuf),

    // Handler resolution
    #[error("unknown server handler: {0}")]
    UnknownHandler(String),

    #[error("no server handler found")]
    NoHandlerFound,

    // Process lifecycle
    #[error("server handler '{handler}' failed: {message}")]
    HandlerFailed { handler: String, message: String },

    #[error("no running server found at {}", .0.display())]
    NoRunningServer(PathBuf),

    #[error("could not signal process {pid}: {message}")]
    SignalFailed { pid: i32, message: String },

    #[error("could not write pid file {}: {source}", .path.display())]
    PidFile { path: PathBuf, source: io::Error },

    // Delegation to external tools
    #[error("the code generator is unavailable - install servctl-gen")]
    GeneratorUnavailable,

    #[error("failed to run {tool}: {source}")]
    DelegateFailed { tool: String, source: io::Error },
}
