// certwatch CLI - certification expiry reconciliation

mod exit_codes;
mod logging;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE, EXIT_WRITE};
use logging::{init_logging, LogConfig};
use run::{cmd_init, cmd_run, cmd_validate, RunArgs};

#[derive(Parser)]
#[command(name = "certwatch")]
#[command(about = "Reconcile certification expiry records and flag upcoming expiries")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the source and month sheets and write the results workbook
    #[command(after_help = "\
Examples:
  certwatch run
  certwatch run certwatch.toml
  certwatch run certwatch.toml --input march.xlsx --output march_Results.xlsx
  certwatch run certwatch.toml --json --dry-run
  certwatch run certwatch.toml --strict-exit --summary-out summary.json

Exit codes:
  0 ok, 1 mismatches (--strict-exit), 2 usage, 3 missing input,
  4 missing sheet, 5 missing column, 6 bad date, 7 write failed,
  8 invalid config, 9 I/O")]
    Run {
        /// Path to the TOML config (defaults apply when omitted)
        config: Option<PathBuf>,

        /// Input workbook or CSV directory (overrides [input] path)
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,

        /// Results workbook (overrides [output] path)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the JSON result to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON result to a file (before the results workbook)
        #[arg(long)]
        summary_out: Option<PathBuf>,

        /// Exit 1 when mismatches are found
        #[arg(long)]
        strict_exit: bool,

        /// Reconcile without writing the results workbook
        #[arg(long)]
        dry_run: bool,
    },

    /// Parse and validate a config without running
    #[command(after_help = "\
Examples:
  certwatch validate certwatch.toml")]
    Validate {
        /// Path to the TOML config
        config: PathBuf,
    },

    /// Write a default config file
    #[command(after_help = "\
Examples:
  certwatch init
  certwatch init jobs/april.toml --force")]
    Init {
        /// Where to write the config
        #[arg(default_value = "certwatch.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  certwatch-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_flags(cli.verbose, cli.quiet));

    let result = match cli.command {
        Commands::Run {
            config,
            input,
            output,
            json,
            summary_out,
            strict_exit,
            dry_run,
        } => cmd_run(RunArgs {
            config,
            input,
            output,
            json,
            summary_out,
            strict_exit,
            dry_run,
            quiet: cli.quiet,
        }),
        Commands::Validate { config } => cmd_validate(config),
        Commands::Init { path, force } => cmd_init(path, force),
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
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self { code: EXIT_WRITE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
