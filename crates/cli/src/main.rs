// payrecon CLI - field-level payroll/HR reconciliation from the shell

mod audit;
mod exit_codes;

use std::process::ExitCode;
use std::sync::OnceLock;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use exit_codes::{EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "payrecon")]
#[command(about = "Compare two payroll/HR exports field by field")]
#[command(version)]
#[command(long_version = long_version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an audit over two exports and a field mapping
    #[command(after_help = "\
Examples:
  payrecon run --side-a paycom.xlsx --side-b uzio.csv --mapping mapping.xlsx \\
      --labels key_mapping.yml --filing-status codes.txt -o audit.xlsx
  payrecon run --profile deduction --side-a book.xlsx --side-b book.xlsx --mapping book.xlsx
  payrecon run --profile dental.audit.toml --side-a adp.csv --side-b uzio.csv \\
      --mapping map.csv --json --strict-exit")]
    Run(audit::RunArgs),

    /// Inspect audit profiles
    #[command(subcommand)]
    Profile(audit::ProfileCommands),
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if std::env::var("RUST_LOG").is_err() {
            builder.filter_module("payrecon", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => audit::cmd_run(args),
        Commands::Profile(cmd) => audit::cmd_profile(cmd),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
