//! The prepare guard shared by every subcommand except `version`
//!
//! `prepare` mutates process-wide state: it may set the `RACK_ENV`
//! variable and change the working directory. It is not safe to call
//! concurrently with other code that depends on either. The effective
//! values are returned as a [`RuntimeContext`] so that downstream code
//! never has to read ambient process state back.

use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Error;

/// Environment variable that selects the application runtime environment.
pub const ENV_VAR: &str = "RACK_ENV";

/// Boot descriptor whose presence marks a valid application root.
pub const BOOT_FILE: &str = "config/boot.rb";

/// Effective runtime context derived from the shared CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeContext {
    /// Effective environment name; an externally set `RACK_ENV` wins over
    /// the `--environment` flag.
    pub environment: String,
    /// Application root after any `--chdir` has been applied.
    pub root: PathBuf,
    /// Location of the boot descriptor under `root`.
    pub boot_file: PathBuf,
}

/// Run the shared preconditions and build the runtime context.
///
/// Idempotent given an unchanged filesystem: running it twice with the
/// same inputs yields the same context.
pub fn prepare(chdir: Option<&Path>, environment: &str) -> Result<RuntimeContext, Error> {
    let environment = resolve_environment(environment);

    let root = match chdir {
        Some(dir) => enter_root(dir)?,
        None => env::current_dir().map_err(|_| Error::RootInaccessible(PathBuf::from(".")))?,
    };

    let boot_file = check_boot_file(&root)?;

    debug!(environment = %environment, root = %root.display(), "prepared runtime context");
    Ok(RuntimeContext {
        environment,
        root,
        boot_file,
    })
}

/// External configuration takes precedence over the CLI flag.
fn resolve_environment(requested: &str) -> String {
    match env::var(ENV_VAR) {
        Ok(existing) if !existing.is_empty() => existing,
        _ => {
            env::set_var(ENV_VAR, requested);
            requested.to_string()
        }
    }
}

fn enter_root(dir: &Path) -> Result<PathBuf, Error> {
    if !dir.exists() {
        return Err(Error::RootMissing(dir.to_path_buf()));
    }
    env::set_current_dir(dir).map_err(|_| Error::RootInaccessible(dir.to_path_buf()))?;
    env::current_dir().map_err(|_| Error::RootInaccessible(dir.to_path_buf()))
}

// prepare touches the working directory and RACK_ENV, both process-wide;
// tests that call it (from any module) serialize on this lock.
#[cfg(test)]
pub(crate) static PROCESS_STATE: std::sync::Mutex<()> = std::sync::Mutex::new(());

fn check_boot_file(root: &Path) -> Result<PathBuf, Error> {
    let boot = root.join(BOOT_FILE);
    if !boot.is_file() {
        return Err(Error::BootFileMissing(root.to_path_buf()));
    }
    Ok(boot)
}
