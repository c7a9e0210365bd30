//! servctl - lifecycle manager for a locally-run Rack application server
//!
//! The library is organized around one invocation per process run:
//! the CLI surface parses the arguments, the prepare guard establishes a
//! [`context::RuntimeContext`], and the subcommand either drives the
//! process lifecycle controller (`start`/`stop`) or hands the process over
//! to an external tool (`rake`/`console`/`generate`/`runner`).

pub mod cli;
pub mod context;
pub mod delegate;
pub mod error;
pub mod handler;
pub mod lifecycle;

pub use context::RuntimeContext;
pub use error::Error;
