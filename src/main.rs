//! hookguard CLI - Circuit breaker for hook commands.

use clap::{ArgGroup, Parser, Subcommand};
use hookguard::cli;
use hookguard::Config;
use hookguard::config::{self, LoggingConfig};
use hookguard::error::{EXIT_SUCCESS, Error};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Get the version string.
///
/// - Release builds (on a git tag): "0.1.0"
/// - Development builds: "0.1.0-dev (abc1234)"
/// - Dirty working directory: "0.1.0-dev (abc1234-dirty)"
fn version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("HOOKGUARD_GIT_HASH");
    const IS_RELEASE: &str = env!("HOOKGUARD_IS_RELEASE");

    static VERSION_STRING: std::sync::OnceLock<String> = std::sync::OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" {
            VERSION.to_string()
        } else {
            format!("{VERSION}-dev ({GIT_HASH})")
        }
    })
}

#[derive(Parser)]
#[command(name = "hookguard")]
#[command(author, version = version(), about = "Circuit breaker for hook commands", long_about = None)]
struct Cli {
    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of the default location.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// [Host] Run a hook command behind the circuit breaker.
    Exec {
        /// Seconds before the command is killed. Defaults to
        /// `execution.timeout_seconds`.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
        timeout: Option<u64>,

        /// The hook command line.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// [User] Show overall hook health and disabled hooks.
    Health,

    /// [User] List every tracked hook with its full state.
    List,

    /// [User] Forget hook history.
    #[command(group(ArgGroup::new("target").required(true).args(["pattern", "all"])))]
    Reset {
        /// Substring of the hook command.
        pattern: Option<String>,

        /// Reset every hook.
        #[arg(long)]
        all: bool,
    },

    /// [User] Re-enable a disabled hook.
    Enable {
        /// Substring of the hook command.
        pattern: String,

        /// Close the circuit now instead of allowing a recovery trial.
        #[arg(long)]
        force: bool,
    },

    /// [User] Disable a hook until it is enabled again.
    Disable {
        /// Substring of the hook command, or a new command line.
        pattern: String,
    },

    /// [User] Show effective configuration.
    Config {
        /// Write the default config file.
        #[arg(long)]
        init: bool,

        /// Overwrite an existing config file.
        #[arg(long, requires = "init")]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let loaded = config::load_config(cli.config.as_deref());

    let logging = loaded
        .as_ref()
        .map_or_else(|_| LoggingConfig::default(), |c| c.logging.clone());
    let _guard = hookguard::logging::init(&logging);

    let json = cli.json;
    let result = match cli.command {
        Commands::Exec { command, timeout } => {
            if let Err(e) = &loaded {
                tracing::warn!(error = %e, "failed to load configuration");
            }
            cli::exec::run(loaded.as_ref().ok(), &command, timeout)
        }
        Commands::Config { init: true, force } => {
            cli::config::init(cli.config.as_deref(), force).map(|()| EXIT_SUCCESS)
        }
        command => loaded.and_then(|config| {
            manage(command, &config, cli.config.as_deref(), json).map(|()| EXIT_SUCCESS)
        }),
    };

    exit(result)
}

/// Run a management command.
fn manage(
    command: Commands,
    config: &Config,
    config_path: Option<&Path>,
    json: bool,
) -> hookguard::Result<()> {
    match command {
        Commands::Health => cli::health::run(config, json),
        Commands::List => cli::list::run(config, json),
        Commands::Reset { pattern, all } => cli::reset::run(config, pattern.as_deref(), all, json),
        Commands::Enable { pattern, force } => cli::enable::run(config, &pattern, force, json),
        Commands::Disable { pattern } => cli::disable::run(config, &pattern, json),
        Commands::Config { init, force } => {
            if init {
                cli::config::init(config_path, force)
            } else {
                cli::config::run(config, config_path, json)
            }
        }
        Commands::Exec { .. } => Err(Error::Usage("exec is not a management command".to_string())),
    }
}

fn exit(result: Result<u8, Error>) -> ExitCode {
    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("hookguard: error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
