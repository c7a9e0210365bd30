//! Process lifecycle control for `start` and `stop`
//!
//! `start` either blocks in the foreground for the life of the server or
//! daemonizes it and records the child pid; `stop` reads the recorded pid
//! and interrupts the process. The pid file is the only state shared
//! between the two, written once by `start` and consumed once by `stop`.

use std::fs;
use std::io::ErrorKind;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use colored::Colorize;
use tracing::{info, warn};

use crate::error::Error;
use crate::handler::{Handler, HandlerRegistry};

/// Default location of the pid record, relative to the application root.
pub const DEFAULT_PID_FILE: &str = "tmp/pids/server.pid";

/// Everything the controller needs to launch a server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Handler name; `None` means probe the registry in order.
    pub server: Option<String>,
    pub host: String,
    pub port: u16,
    pub daemonize: bool,
    /// Where to record the child pid when daemonizing.
    pub pid: PathBuf,
    pub debug: bool,
    /// Extra NAME=VALUE options passed through to the handler.
    pub options: Vec<(String, String)>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: None,
            host: "127.0.0.1".to_string(),
            port: 3000,
            daemonize: false,
            pid: PathBuf::from(DEFAULT_PID_FILE),
            debug: false,
            options: Vec::new(),
        }
    }
}

/// Reduced configuration for `stop`: the pid record is the only identity
/// a stopped server needs.
#[derive(Debug, Clone)]
pub struct StopConfig {
    pub pid: PathBuf,
}

/// Start the application server described by `config`.
///
/// Foreground mode blocks until the server exits; daemonized mode returns
/// as soon as the child is detached and its pid is on disk.
pub fn start(registry: &HandlerRegistry, config: &ServerConfig) -> Result<(), Error> {
    let handler = registry.resolve(config.server.as_deref())?;
    if config.daemonize {
        daemonize(handler, config)
    } else {
        foreground(handler, config)
    }
}

/// Stop a previously daemonized server via its pid record.
///
/// Interrupting a process that is already gone counts as success; the
/// stale pid file is removed either way. `stop` does not wait for the
/// process to actually exit.
pub fn stop(config: &StopConfig) -> Result<(), Error> {
    let pid = read_pid(&config.pid)?;

    if signal_interrupt(pid)? {
        info!(pid, "sent interrupt");
        println!("=> Sent interrupt to process {pid}");
    } else {
        warn!(pid, "process already gone, removing stale pid file");
        println!("=> Process {pid} is already gone");
    }

    // Benign if a concurrent stop removed the file between read and here.
    if let Err(err) = fs::remove_file(&config.pid) {
        if err.kind() != ErrorKind::NotFound {
            warn!(path = %config.pid.display(), %err, "could not remove pid file");
        }
    }
    Ok(())
}

/// Render the resolved handler's pass-through options for
/// `--server-options`.
///
/// Host and Port entries are filtered out; binding is owned by the
/// controller. This path never spawns anything.
pub fn server_options(registry: &HandlerRegistry, config: &ServerConfig) -> Result<String, Error> {
    let handler = registry.resolve(config.server.as_deref())?;

    let mut lines = vec![
        String::new(),
        format!("Server-specific options for {}:", handler.name()),
    ];
    let mut any = false;
    for (name, description) in handler.valid_options() {
        if name.starts_with("Host") || name.starts_with("Port") {
            continue;
        }
        lines.push(format!("  -O {name:<21} {description}"));
        any = true;
    }
    if !any {
        return Ok(String::new());
    }
    Ok(lines.join("\n"))
}

fn foreground(handler: &dyn Handler, config: &ServerConfig) -> Result<(), Error> {
    info!(
        handler = handler.name(),
        host = %config.host,
        port = config.port,
        "starting server in the foreground"
    );
    println!(
        "=> Starting {} on {}:{}",
        handler.name().cyan(),
        config.host,
        config.port
    );

    let mut child = handler
        .command(config)
        .spawn()
        .map_err(|err| handler_failed(handler, err.to_string()))?;

    let status = child
        .wait()
        .map_err(|err| handler_failed(handler, err.to_string()))?;
    if !status.success() {
        return Err(handler_failed(handler, format!("exited with {status}")));
    }
    Ok(())
}

fn daemonize(handler: &dyn Handler, config: &ServerConfig) -> Result<(), Error> {
    let mut command = handler.command(config);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    // New session so the server outlives this run and the terminal.
    unsafe {
        command.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = command
        .spawn()
        .map_err(|err| handler_failed(handler, err.to_string()))?;
    write_pid(&config.pid, child.id())?;

    info!(
        handler = handler.name(),
        pid = child.id(),
        pid_file = %config.pid.display(),
        "server daemonized"
    );
    println!(
        "=> {} started in the background (pid {})",
        handler.name().cyan(),
        child.id()
    );
    Ok(())
}

fn handler_failed(handler: &dyn Handler, message: String) -> Error {
    Error::HandlerFailed {
        handler: handler.name().to_string(),
        message,
    }
}

fn write_pid(path: &Path, pid: u32) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| Error::PidFile {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }
    fs::write(path, format!("{pid}\n")).map_err(|source| Error::PidFile {
        path: path.to_path_buf(),
        source,
    })
}

fn read_pid(path: &Path) -> Result<i32, Error> {
    let raw =
        fs::read_to_string(path).map_err(|_| Error::NoRunningServer(path.to_path_buf()))?;
    let pid: i32 = raw
        .trim()
        .parse()
        .map_err(|_| Error::NoRunningServer(path.to_path_buf()))?;
    // A pid record only ever holds a positive pid; 0 and negatives would
    // address process groups when passed to kill.
    if pid <= 0 {
        return Err(Error::NoRunningServer(path.to_path_buf()));
    }
    Ok(pid)
}

/// Deliver SIGINT to `pid`. Returns `Ok(false)` when the process no
/// longer exists, which `stop` treats as success.
fn signal_interrupt(pid: i32) -> Result<bool, Error> {
    let rc = unsafe { libc::kill(pid, libc::SIGINT) };
    if rc == 0 {
        return Ok(true);
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        return Ok(false);
    }
    Err(Error::SignalFailed {
        pid,
        message: err.to_string(),
    })
}
