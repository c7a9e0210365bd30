//! Delegation to the task runner, console, generator, and code runner
//!
//! These subcommands run only after the prepare guard has succeeded, so
//! the working directory is the application root and the environment
//! variable is set. Each hands the process over with `exec`: the external
//! tool owns the terminal and its exit status becomes ours.

use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;

use colored::Colorize;
use which::which;

use crate::context::{RuntimeContext, BOOT_FILE, ENV_VAR};
use crate::error::Error;

pub const RAKE_PROGRAM: &str = "rake";
pub const CONSOLE_PROGRAM: &str = "irb";
pub const RUNTIME_PROGRAM: &str = "ruby";
pub const GENERATOR_PROGRAM: &str = "servctl-gen";

/// Execute rake tasks in the application environment.
pub fn rake(
    ctx: &RuntimeContext,
    list: &Option<Option<String>>,
    trace: bool,
    tasks: &[String],
) -> Result<(), Error> {
    let args = rake_args(list, trace, tasks);
    println!("=> Executing {} {} ...", RAKE_PROGRAM.cyan(), args.join(" "));
    let mut command = Command::new(RAKE_PROGRAM);
    command.args(&args).env(ENV_VAR, &ctx.environment);
    exec(command, RAKE_PROGRAM)
}

/// Boot the interactive application console.
pub fn console(ctx: &RuntimeContext) -> Result<(), Error> {
    println!(
        "=> Loading {} console (servctl v{})",
        ctx.environment.cyan(),
        env!("CARGO_PKG_VERSION")
    );
    let mut command = Command::new(CONSOLE_PROGRAM);
    command
        .arg("-r")
        .arg(format!("./{BOOT_FILE}"))
        .env(ENV_VAR, &ctx.environment);
    exec(command, CONSOLE_PROGRAM)
}

/// Run the code generator with the forwarded arguments.
///
/// A generator binary missing from PATH is the one failure that gets an
/// advisory instead of a raw error; anything else propagates untouched.
pub fn generate(ctx: &RuntimeContext, args: &[String]) -> Result<(), Error> {
    if which(GENERATOR_PROGRAM).is_err() {
        return Err(Error::GeneratorUnavailable);
    }
    let mut command = Command::new(GENERATOR_PROGRAM);
    command.args(&generate_args(args)).env(ENV_VAR, &ctx.environment);
    exec(command, GENERATOR_PROGRAM)
}

/// Run a piece of code, or a file of code, inside the application
/// environment.
///
/// This is deliberately an "execute arbitrary code in the application's
/// context" capability; the runtime collaborator evaluates it and servctl
/// neither sandboxes nor interprets it.
pub fn runner(ctx: &RuntimeContext, code_or_file: &str) -> Result<(), Error> {
    let mut command = Command::new(RUNTIME_PROGRAM);
    command
        .args(&runner_args(code_or_file))
        .env(ENV_VAR, &ctx.environment);
    exec(command, RUNTIME_PROGRAM)
}

/// Build the rake argument vector from the CLI flags.
pub fn rake_args(list: &Option<Option<String>>, trace: bool, tasks: &[String]) -> Vec<String> {
    let mut args: Vec<String> = tasks.to_vec();
    if let Some(pattern) = list {
        args.push("-T".to_string());
        if let Some(pattern) = pattern {
            // A literal "list" pattern means "everything".
            if pattern != "list" {
                args.push(pattern.clone());
            }
        }
    }
    if trace {
        args.push("--trace".to_string());
    }
    args
}

fn generate_args(args: &[String]) -> Vec<String> {
    if args.is_empty() {
        vec!["help".to_string()]
    } else {
        args.to_vec()
    }
}

fn runner_args(code_or_file: &str) -> Vec<String> {
    let mut args = vec!["-r".to_string(), format!("./{BOOT_FILE}")];
    if Path::new(code_or_file).is_file() {
        args.push(code_or_file.to_string());
    } else {
        args.push("-e".to_string());
        args.push(code_or_file.to_string());
    }
    args
}

/// Replace this process with `command`; only returns on failure.
fn exec(mut command: Command, tool: &str) -> Result<(), Error> {
    let source = command.exec();
    Err(Error::DelegateFailed {
        tool: tool.to_string(),
        source,
    })
}
