//! Server handler registry
//!
//! A handler knows how to launch one concrete HTTP server program for the
//! application. Handlers are registered in probe order: `--server` picks
//! one by name, otherwise the first handler whose program is installed
//! wins.

use std::process::Command;

use which::which;

use crate::error::Error;
use crate::lifecycle::ServerConfig;

/// A pluggable server implementation.
pub trait Handler {
    /// Registry name, matched against `--server`.
    fn name(&self) -> &'static str;

    /// Whether the underlying server program is installed.
    fn available(&self) -> bool;

    /// Build the command that runs the server with the given binding.
    fn command(&self, config: &ServerConfig) -> Command;

    /// Pass-through option names and descriptions, in display order.
    ///
    /// Includes the handler's own Host/Port entries; the lifecycle layer
    /// filters those out because binding is owned by servctl.
    fn valid_options(&self) -> &'static [(&'static str, &'static str)];
}

/// Ordered collection of server handlers.
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn Handler>>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    /// Registry with the built-in handlers in probe order.
    pub fn new() -> Self {
        Self {
            handlers: vec![Box::new(Puma), Box::new(Thin), Box::new(Rackup)],
        }
    }

    /// Registry with no handlers.
    pub fn empty() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Append a handler; it probes after everything already registered.
    pub fn register(&mut self, handler: Box<dyn Handler>) {
        self.handlers.push(handler);
    }

    /// Pick a handler by name, or the first available one when no name is
    /// given.
    pub fn resolve(&self, name: Option<&str>) -> Result<&dyn Handler, Error> {
        match name {
            Some(name) => self
                .handlers
                .iter()
                .map(|h| h.as_ref())
                .find(|h| h.name() == name)
                .ok_or_else(|| Error::UnknownHandler(name.to_string())),
            None => self
                .handlers
                .iter()
                .map(|h| h.as_ref())
                .find(|h| h.available())
                .ok_or(Error::NoHandlerFound),
        }
    }
}

struct Puma;

impl Handler for Puma {
    fn name(&self) -> &'static str {
        "puma"
    }

    fn available(&self) -> bool {
        which("puma").is_ok()
    }

    fn command(&self, config: &ServerConfig) -> Command {
        let mut cmd = Command::new("puma");
        cmd.arg("--bind")
            .arg(format!("tcp://{}:{}", config.host, config.port));
        if config.debug {
            cmd.arg("--debug");
        }
        for (name, value) in &config.options {
            cmd.arg(format!("--{}={}", name.to_lowercase(), value));
        }
        cmd
    }

    fn valid_options(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("Host", "hostname to bind, managed by servctl"),
            ("Port", "port to bind, managed by servctl"),
            ("Threads", "min:max thread count"),
            ("Workers", "number of worker processes"),
            ("Quiet", "do not log requests"),
        ]
    }
}

struct Thin;

impl Handler for Thin {
    fn name(&self) -> &'static str {
        "thin"
    }

    fn available(&self) -> bool {
        which("thin").is_ok()
    }

    fn command(&self, config: &ServerConfig) -> Command {
        let mut cmd = Command::new("thin");
        cmd.arg("start")
            .args(["--address", config.host.as_str()])
            .arg("--port")
            .arg(config.port.to_string());
        if config.debug {
            cmd.arg("--debug");
        }
        for (name, value) in &config.options {
            cmd.arg(format!("--{}={}", name.to_lowercase(), value));
        }
        cmd
    }

    fn valid_options(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("Host", "hostname to bind, managed by servctl"),
            ("Port", "port to bind, managed by servctl"),
            ("Timeout", "request timeout in seconds"),
            ("MaxConns", "maximum simultaneous connections"),
            ("Threaded", "call the application in threads"),
        ]
    }
}

struct Rackup;

impl Handler for Rackup {
    fn name(&self) -> &'static str {
        "rackup"
    }

    fn available(&self) -> bool {
        which("rackup").is_ok()
    }

    fn command(&self, config: &ServerConfig) -> Command {
        let mut cmd = Command::new("rackup");
        cmd.args(["--host", config.host.as_str()])
            .arg("--port")
            .arg(config.port.to_string());
        if config.debug {
            cmd.arg("--debug");
        }
        // rackup forwards -O NAME=VALUE pairs to whichever server it picks.
        for (name, value) in &config.options {
            cmd.arg("-O").arg(format!("{name}={value}"));
        }
        cmd
    }

    fn valid_options(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("Host", "hostname to bind, managed by servctl"),
            ("Port", "port to bind, managed by servctl"),
            ("AccessLog", "access log destination"),
            ("Quiet", "suppress the startup banner"),
        ]
    }
}
