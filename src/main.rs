//! termselect CLI
//!
//! Inline terminal menus for shell scripts. The menu is drawn on stderr,
//! the result printed on stdout:
//!
//!     eval "$(termselect multi --name picks apples pears plums)"

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use termselect::report::{
    format_multi, format_single, is_shell_identifier, parse_defaults, parse_legend_flag,
    resolve_format,
};
use termselect::{MenuConfig, MenuError, OutputFormat};

/// Exit status after Ctrl-C, as a shell would report SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

/// Log file name inside the log directory.
const LOG_FILE: &str = "termselect.log";

const USAGE: &str = "\
Inline terminal menus for shell scripts.

Navigate with the up/down arrows, toggle with space, confirm with enter.
Ctrl-C aborts with exit status 130 and leaves the terminal as it was.

The menu is drawn on stderr and the result printed on stdout, so the
command can run inside $(...):

  # one true/false per option
  termselect multi --defaults true,false,true apples pears plums

  # assign a bash array
  eval \"$(termselect multi --name picks apples pears plums)\"

  # the chosen label, or an empty line if nothing is selected
  termselect single --default 1 --legend true red green blue";

#[derive(Parser)]
#[command(name = "termselect")]
#[command(about = "Inline single- and multi-choice terminal menus")]
#[command(long_about = USAGE)]
#[command(version)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Write a debug log under the user cache directory
    #[arg(long, global = true)]
    log: bool,

    /// Write a debug log into this directory (implies --log)
    #[arg(long, global = true, env = "TERMSELECT_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Checkbox menu: any number of options may be checked
    Multi {
        #[command(flatten)]
        menu: MenuArgs,

        /// Initial state per option, comma separated (missing ones are unchecked)
        #[arg(long, value_delimiter = ',', value_name = "true|false,...")]
        defaults: Vec<String>,
    },

    /// Radio menu: at most one option may be selected
    Single {
        #[command(flatten)]
        menu: MenuArgs,

        /// Index of the initially selected option
        #[arg(long, default_value_t = 0)]
        default: usize,
    },
}

#[derive(Args)]
struct MenuArgs {
    /// Show the navigation legend (only the literal `true` enables it)
    #[arg(long, default_value = "false", value_name = "true|false")]
    legend: String,

    /// Variable to assign the result to (prints `NAME=...`)
    #[arg(long, value_parser = parse_variable_name)]
    name: Option<String>,

    /// Output format (default: shell with --name, plain otherwise)
    #[arg(long, value_enum)]
    format: Option<OutputFormatArg>,

    /// How long to wait for the rest of an escape sequence
    #[arg(long, default_value_t = 100, value_name = "MS")]
    escape_timeout_ms: u64,

    /// Options to choose from, in display order
    #[arg(required = true)]
    options: Vec<String>,
}

impl MenuArgs {
    fn config(&self) -> MenuConfig {
        MenuConfig {
            legend: parse_legend_flag(&self.legend),
            escape_timeout: Duration::from_millis(self.escape_timeout_ms),
        }
    }

    fn output_format(&self) -> OutputFormat {
        resolve_format(self.format.map(Into::into), self.name.as_deref())
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormatArg {
    Plain,
    Shell,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Plain => OutputFormat::Plain,
            OutputFormatArg::Shell => OutputFormat::Shell,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

fn parse_variable_name(value: &str) -> Result<String, String> {
    if is_shell_identifier(value) {
        Ok(value.to_string())
    } else {
        Err(format!("`{}` is not a valid shell variable name", value))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match log_directory(cli.log, cli.log_dir) {
        Some(dir) => match setup_logging(&dir) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Error: could not set up logging in {}: {}", dir.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let result = match cli.command {
        Commands::Multi { menu, defaults } => cmd_multi(menu, defaults),
        Commands::Single { menu, default } => cmd_single(menu, default),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(MenuError::Interrupted) => ExitCode::from(EXIT_INTERRUPTED),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

fn cmd_multi(menu: MenuArgs, defaults: Vec<String>) -> Result<(), MenuError> {
    let config = menu.config();
    let defaults = parse_defaults(&defaults);
    tracing::info!(options = menu.options.len(), ?defaults, "multi-select requested");

    let checked = multiselect(&menu.options, &defaults, &config)?;

    print!(
        "{}",
        format_multi(&checked, menu.output_format(), menu.name.as_deref())
    );
    Ok(())
}

fn cmd_single(menu: MenuArgs, default: usize) -> Result<(), MenuError> {
    let config = menu.config();
    tracing::info!(options = menu.options.len(), default, "single-select requested");

    let selected = singleselect(&menu.options, default, &config)?;

    print!(
        "{}",
        format_single(
            selected.as_deref(),
            menu.output_format(),
            menu.name.as_deref()
        )
    );
    Ok(())
}

#[cfg(unix)]
fn multiselect(options: &[String], defaults: &[bool], config: &MenuConfig) -> Result<Vec<bool>, MenuError> {
    termselect::multiselect(options, defaults, config)
}

#[cfg(unix)]
fn singleselect(options: &[String], default: usize, config: &MenuConfig) -> Result<Option<String>, MenuError> {
    termselect::singleselect(options, default, config)
}

#[cfg(not(unix))]
fn multiselect(_: &[String], _: &[bool], _: &MenuConfig) -> Result<Vec<bool>, MenuError> {
    Err(unsupported_platform())
}

#[cfg(not(unix))]
fn singleselect(_: &[String], _: usize, _: &MenuConfig) -> Result<Option<String>, MenuError> {
    Err(unsupported_platform())
}

#[cfg(not(unix))]
fn unsupported_platform() -> MenuError {
    MenuError::Io(io::Error::new(
        io::ErrorKind::Unsupported,
        "interactive menus need a Unix terminal",
    ))
}

// ============================================================================
// LOGGING
// ============================================================================

/// Resolve where to log, if anywhere.
fn log_directory(log: bool, log_dir: Option<PathBuf>) -> Option<PathBuf> {
    match log_dir {
        Some(dir) => Some(dir),
        None if log => Some(
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("termselect"),
        ),
        None => None,
    }
}

/// Log to a file only: the terminal belongs to the menu.
///
/// Filter with `RUST_LOG`; defaults to debug for this crate.
fn setup_logging(dir: &Path) -> io::Result<WorkerGuard> {
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, LOG_FILE);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("termselect=debug"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .map_err(io::Error::other)?;

    tracing::info!(log_dir = %dir.display(), "logging initialized");
    Ok(guard)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn multi_arguments_map_to_config() {
        let cli = Cli::try_parse_from([
            "termselect",
            "multi",
            "--legend",
            "true",
            "--defaults",
            "true,false,true",
            "a",
            "b",
            "c",
        ])
        .unwrap();
        match cli.command {
            Commands::Multi { menu, defaults } => {
                assert!(menu.config().legend);
                assert_eq!(parse_defaults(&defaults), vec![true, false, true]);
                assert_eq!(menu.options, vec!["a", "b", "c"]);
                assert_eq!(menu.output_format(), OutputFormat::Plain);
            }
            Commands::Single { .. } => panic!("Expected multi"),
        }
    }

    #[test]
    fn legend_other_than_true_stays_hidden() {
        let cli = Cli::try_parse_from(["termselect", "single", "--legend", "yes", "a"]).unwrap();
        match cli.command {
            Commands::Single { menu, default } => {
                assert!(!menu.config().legend);
                assert_eq!(default, 0);
            }
            Commands::Multi { .. } => panic!("Expected single"),
        }
    }

    #[test]
    fn name_selects_shell_output() {
        let cli =
            Cli::try_parse_from(["termselect", "single", "--name", "color", "--default", "2", "r", "g", "b"])
                .unwrap();
        match cli.command {
            Commands::Single { menu, default } => {
                assert_eq!(default, 2);
                assert_eq!(menu.output_format(), OutputFormat::Shell);
                assert_eq!(menu.name.as_deref(), Some("color"));
            }
            Commands::Multi { .. } => panic!("Expected single"),
        }
    }

    #[test]
    fn invalid_variable_name_is_rejected() {
        let result = Cli::try_parse_from(["termselect", "multi", "--name", "9lives", "a"]);
        assert!(result.is_err());
    }

    #[test]
    fn options_are_required() {
        assert!(Cli::try_parse_from(["termselect", "multi"]).is_err());
    }

    #[test]
    fn escape_timeout_is_configurable() {
        let cli = Cli::try_parse_from(["termselect", "multi", "--escape-timeout-ms", "250", "a"]).unwrap();
        match cli.command {
            Commands::Multi { menu, .. } => {
                assert_eq!(menu.config().escape_timeout, Duration::from_millis(250));
            }
            Commands::Single { .. } => panic!("Expected multi"),
        }
    }

    #[test]
    fn log_dir_overrides_default_location() {
        let dir = PathBuf::from("/tmp/termselect-logs");
        assert_eq!(log_directory(false, Some(dir.clone())), Some(dir));
        assert_eq!(log_directory(false, None), None);
        assert!(log_directory(true, None).is_some());
    }
}
