//! CLI surface and subcommand dispatch
//!
//! The clap derive structs are the option schema: every declared flag has
//! a type, default, and alias here, so downstream code never observes an
//! absent option. `run` is the top-level entry point that converts every
//! failure into a single printed line and a non-zero exit code.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;

use crate::context;
use crate::delegate;
use crate::error::Error;
use crate::handler::HandlerRegistry;
use crate::lifecycle::{self, ServerConfig, StopConfig, DEFAULT_PID_FILE};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// servctl - lifecycle manager for a locally-run Rack application server
#[derive(Debug, Parser)]
#[command(name = "servctl")]
#[command(about = "Lifecycle manager for a locally-run Rack application server")]
#[command(version = VERSION)]
#[command(disable_version_flag = true)]
#[command(after_help = r#"EXAMPLES:
    servctl start --port 4000
    servctl start --daemonize
    servctl stop
    servctl rake db:migrate --trace
    servctl console
    servctl runner "puts App.settings.inspect"
"#)]
pub struct Cli {
    /// Change to DIR before running the subcommand
    #[arg(short = 'c', long, global = true, value_name = "DIR")]
    pub chdir: Option<PathBuf>,

    /// Application environment (an externally set RACK_ENV wins)
    #[arg(
        short = 'e',
        long,
        global = true,
        default_value = "development",
        value_name = "NAME"
    )]
    pub environment: String,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the application server
    #[command(alias = "s")]
    Start {
        /// Server handler to use (default: autodetect)
        #[arg(short = 'a', long, value_name = "NAME")]
        server: Option<String>,

        /// Bind to HOST address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Use PORT
        #[arg(short = 'p', long, default_value_t = 3000)]
        port: u16,

        /// Run daemonized in the background
        #[arg(short = 'd', long)]
        daemonize: bool,

        /// File to store the pid
        #[arg(short = 'i', long, value_name = "FILE")]
        pid: Option<PathBuf>,

        /// Set debugging flags
        #[arg(long)]
        debug: bool,

        /// Pass NAME=VALUE options through to the server handler
        #[arg(short = 'O', long = "options", value_name = "NAME=VALUE", num_args = 1..)]
        options: Vec<String>,

        /// List the handler-specific options usable with --options
        #[arg(long = "server-options", alias = "server_options")]
        server_options: bool,
    },

    /// Stop the application server
    #[command(alias = "st")]
    Stop {
        /// File the pid was stored in
        #[arg(short = 'p', long, value_name = "FILE", default_value = DEFAULT_PID_FILE)]
        pid: PathBuf,
    },

    /// Execute rake tasks
    Rake {
        /// Display tasks (matching optional PATTERN) with descriptions
        #[arg(short = 'T', long, value_name = "PATTERN", num_args = 0..=1)]
        list: Option<Option<String>>,

        /// Turn on invoke/execute tracing, enable full backtrace
        #[arg(short = 't', long)]
        trace: bool,

        /// Task names and arguments, forwarded to rake
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Boot the interactive application console
    #[command(alias = "c")]
    Console,

    /// Run the code generator with the given arguments
    #[command(alias = "gen", alias = "g")]
    Generate {
        /// Arguments forwarded verbatim to the generator
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run a piece of code in the application environment
    #[command(alias = "run", alias = "r")]
    Runner {
        /// Code string, or path to a file of code, to execute
        #[arg(required = true, value_name = "CODE_OR_FILE")]
        code_or_file: String,
    },

    /// Show the servctl version
    Version,
}

/// Top-level entry point: parse, prepare, route, and convert errors into
/// exit codes. Never lets an internal fault escape as a panic message.
pub fn run<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version displays are clean exits, not failures.
            let failed = err.use_stderr();
            let _ = err.print();
            return if failed {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<(), Error> {
    // `version` is the one subcommand that skips the prepare guard.
    if matches!(cli.command, Command::Version) {
        println!("servctl v{VERSION}");
        return Ok(());
    }

    let ctx = context::prepare(cli.chdir.as_deref(), &cli.environment)?;

    match cli.command {
        Command::Start {
            server,
            host,
            port,
            daemonize,
            pid,
            debug,
            options,
            server_options,
        } => {
            let config = ServerConfig {
                server,
                host,
                port,
                daemonize,
                pid: ctx
                    .root
                    .join(pid.unwrap_or_else(|| PathBuf::from(DEFAULT_PID_FILE))),
                debug,
                options: parse_handler_options(&options),
            };
            let registry = HandlerRegistry::new();
            if server_options {
                println!("{}", lifecycle::server_options(&registry, &config)?);
                Ok(())
            } else {
                lifecycle::start(&registry, &config)
            }
        }
        Command::Stop { pid } => lifecycle::stop(&StopConfig {
            pid: ctx.root.join(pid),
        }),
        Command::Rake { list, trace, args } => delegate::rake(&ctx, &list, trace, &args),
        Command::Console => delegate::console(&ctx),
        Command::Generate { args } => delegate::generate(&ctx, &args),
        Command::Runner { code_or_file } => delegate::runner(&ctx, &code_or_file),
        Command::Version => Ok(()), // handled before prepare
    }
}

/// Split raw NAME=VALUE pairs; a bare NAME means "true".
fn parse_handler_options(raw: &[String]) -> Vec<(String, String)> {
    raw.iter()
        .map(|entry| match entry.split_once('=') {
            Some((name, value)) => (name.to_string(), value.to_string()),
            None => (entry.clone(), "true".to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn start_defaults_are_materialized() {
        let cli = parse(&["servctl", "start"]);
        match cli.command {
            Command::Start {
                server,
                host,
                port,
                daemonize,
                pid,
                debug,
                options,
                server_options,
            } => {
                assert_eq!(server, None);
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 3000);
                assert!(!daemonize);
                assert_eq!(pid, None);
                assert!(!debug);
                assert!(options.is_empty());
                assert!(!server_options);
            }
            _ => panic!("expected start"),
        }
        assert_eq!(cli.environment, "development");
        assert_eq!(cli.chdir, None);
    }

    #[test]
    fn start_flags_override_defaults() {
        let cli = parse(&["servctl", "start", "--port", "4000", "--daemonize"]);
        match cli.command {
            Command::Start {
                port, daemonize, ..
            } => {
                assert_eq!(port, 4000);
                assert!(daemonize);
            }
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn options_accumulate_until_next_flag() {
        let cli = parse(&[
            "servctl", "start", "-O", "Threads=2:8", "Quiet", "--port", "4000",
        ]);
        match cli.command {
            Command::Start { options, port, .. } => {
                assert_eq!(options, vec!["Threads=2:8", "Quiet"]);
                assert_eq!(port, 4000);
            }
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn subcommand_aliases_resolve() {
        assert!(matches!(parse(&["servctl", "s"]).command, Command::Start { .. }));
        assert!(matches!(parse(&["servctl", "st"]).command, Command::Stop { .. }));
        assert!(matches!(parse(&["servctl", "c"]).command, Command::Console));
        assert!(matches!(
            parse(&["servctl", "g", "model", "User"]).command,
            Command::Generate { .. }
        ));
        assert!(matches!(
            parse(&["servctl", "r", "puts 1"]).command,
            Command::Runner { .. }
        ));
    }

    #[test]
    fn stop_pid_has_default() {
        let cli = parse(&["servctl", "stop"]);
        match cli.command {
            Command::Stop { pid } => assert_eq!(pid, PathBuf::from(DEFAULT_PID_FILE)),
            _ => panic!("expected stop"),
        }
    }

    #[test]
    fn unknown_flag_names_the_offending_token() {
        let err = Cli::try_parse_from(["servctl", "start", "--bogus"]).unwrap_err();
        assert!(err.to_string().contains("--bogus"));
    }

    #[test]
    fn runner_requires_a_positional() {
        assert!(Cli::try_parse_from(["servctl", "runner"]).is_err());
    }

    #[test]
    fn rake_forwards_trailing_arguments() {
        let cli = parse(&["servctl", "rake", "--trace", "db:migrate", "db:seed"]);
        match cli.command {
            Command::Rake { trace, args, .. } => {
                assert!(trace);
                assert_eq!(args, vec!["db:migrate", "db:seed"]);
            }
            _ => panic!("expected rake"),
        }
    }

    #[test]
    fn shared_flags_parse_on_any_subcommand() {
        let cli = parse(&["servctl", "console", "--chdir", "/srv/app", "-e", "production"]);
        assert_eq!(cli.chdir, Some(PathBuf::from("/srv/app")));
        assert_eq!(cli.environment, "production");
    }

    #[test]
    fn server_options_flag_accepts_both_spellings() {
        for flag in ["--server-options", "--server_options"] {
            let cli = parse(&["servctl", "start", flag]);
            match cli.command {
                Command::Start { server_options, .. } => assert!(server_options),
                _ => panic!("expected start"),
            }
        }
    }

    #[test]
    fn handler_options_split_into_pairs() {
        let pairs = parse_handler_options(&[
            "Threads=2:8".to_string(),
            "Quiet".to_string(),
        ]);
        assert_eq!(
            pairs,
            vec![
                ("Threads".to_string(), "2:8".to_string()),
                ("Quiet".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn version_subcommand_parses() {
        assert!(matches!(parse(&["servctl", "version"]).command, Command::Version));
    }

    #[test]
    fn version_skips_the_prepare_guard() {
        // Runs from an arbitrary directory with no boot file in sight.
        dispatch(parse(&["servctl", "version"])).unwrap();
    }

    #[test]
    fn start_with_missing_chdir_reports_the_literal_path() {
        let _guard = crate::context::PROCESS_STATE.lock().unwrap();
        let err = dispatch(parse(&["servctl", "start", "--chdir", "/does/not/exist"])).unwrap_err();
        assert!(matches!(err, Error::RootMissing(_)));
        assert!(err.to_string().contains("/does/not/exist"));
    }
}
