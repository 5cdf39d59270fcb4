//! `certwatch run`, `validate` and `init`: config-driven expiry reconciliation.

use std::path::{Path, PathBuf};

use certwatch_io::{open_source, XlsxSink};
use certwatch_recon::config::DEFAULT_CONFIG_TOML;
use certwatch_recon::engine::run_with;
use certwatch_recon::{ReconConfig, ReconError, ReconResult, ReportSink};
use tracing::{debug, info};

use crate::exit_codes::{recon_exit_code, EXIT_INVALID_CONFIG, EXIT_MISMATCHES};
use crate::CliError;

/// Options of `certwatch run`, after argument parsing.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub json: bool,
    pub summary_out: Option<PathBuf>,
    pub strict_exit: bool,
    pub dry_run: bool,
    pub quiet: bool,
}

fn recon_err(err: ReconError) -> CliError {
    let hint = match &err {
        ReconError::MissingInput(_) => Some("check [input] path or pass --input".to_string()),
        ReconError::MissingSheet { .. } => {
            Some("sheet names are case-sensitive; see [input] source_sheet / month_sheet".to_string())
        }
        ReconError::MissingColumn { .. } => {
            Some("column names match case-insensitively; see [dates] expiry_column".to_string())
        }
        ReconError::DateParse { .. } => {
            Some("expected a date such as 2025-06-10, 06/10/2025 or a spreadsheet date cell".to_string())
        }
        _ => None,
    };
    CliError {
        code: recon_exit_code(&err),
        message: err.to_string(),
        hint,
    }
}

/// Load and validate a config file.
fn load_config(path: &Path) -> Result<ReconConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError {
        code: EXIT_INVALID_CONFIG,
        message: format!("cannot read config {}: {e}", path.display()),
        hint: Some("create one with `certwatch init`".to_string()),
    })?;
    ReconConfig::from_toml(&text).map_err(recon_err)
}

/// Resolve a config-relative path against the config file's directory.
fn resolve_path(base_dir: &Path, configured: &str) -> PathBuf {
    let p = Path::new(configured);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// Effective input and output paths: flags win, then config paths relative
/// to the config directory, then defaults relative to the working directory.
fn effective_paths(args: &RunArgs, config: &ReconConfig) -> (PathBuf, PathBuf) {
    let base_dir = args
        .config
        .as_deref()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let input = args
        .input
        .clone()
        .unwrap_or_else(|| resolve_path(base_dir, &config.input.path));
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| resolve_path(base_dir, &config.output.path));
    (input, output)
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ReconConfig::default(),
    };
    let (input, output) = effective_paths(&args, &config);
    debug!(input = %input.display(), output = %output.display(), "resolved paths");

    if input == output {
        return Err(CliError::usage(format!("output {} would overwrite the input", output.display()))
            .with_hint("pass a different --output"));
    }

    let mut source = open_source(&input).map_err(recon_err)?;
    let result = run_with(&config, source.as_mut(), None).map_err(recon_err)?;
    info!(issues = result.summary.issues, "reconciliation finished");

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::write(format!("JSON serialization error: {e}")))?;

    // Summary before the workbook
    if let Some(ref path) = args.summary_out {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::write(format!("cannot write summary {}: {e}", path.display())))?;
    }

    if !args.dry_run {
        XlsxSink::new(&output).write_bundle(&result.bundle).map_err(recon_err)?;
        info!(output = %output.display(), "wrote results workbook");
    }

    if args.json {
        println!("{json_str}");
    }

    if !args.quiet {
        print_summary(&config, &result, &input, (!args.dry_run).then_some(output.as_path()));
        if let Some(ref path) = args.summary_out {
            eprintln!("wrote {}", path.display());
        }
    }

    if args.strict_exit && result.summary.has_issues() {
        return Err(CliError {
            code: EXIT_MISMATCHES,
            message: String::new(),
            hint: None,
        });
    }
    Ok(())
}

/// Human summary to stderr.
fn print_summary(config: &ReconConfig, result: &ReconResult, input: &Path, written: Option<&Path>) {
    let s = &result.summary;
    eprintln!(
        "read {}: '{}' ({} rows), '{}' ({} rows)",
        input.display(),
        config.input.source_sheet,
        s.source_rows,
        config.input.month_sheet,
        s.month_rows,
    );
    if s.has_issues() {
        eprintln!(
            "{} mismatches: {} only in '{}', {} only in '{}' ({} matched)",
            s.issues, s.source_only, config.input.source_sheet, s.month_only, config.input.month_sheet, s.matched,
        );
    } else {
        eprintln!("no mismatches ({} matched)", s.matched);
    }
    for w in &result.warnings {
        eprintln!("warning: {w}");
    }
    let sheets: Vec<String> = result
        .sheets
        .iter()
        .map(|m| format!("{} ({} rows)", m.name, m.rows))
        .collect();
    match written {
        Some(path) => eprintln!("wrote {}: {}", path.display(), sheets.join(", ")),
        None => eprintln!("dry run, not written: {}", sheets.join(", ")),
    }
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let args = RunArgs {
        config: Some(config_path),
        ..Default::default()
    };
    let (input, output) = effective_paths(&args, &config);
    eprintln!(
        "valid: '{}' reads '{}' and '{}' from {}, writes {} column(s) of '{}' to {}",
        config.name,
        config.input.source_sheet,
        config.input.month_sheet,
        input.display(),
        config.output.month_columns.len(),
        config.output.month_sheet,
        output.display(),
    );
    Ok(())
}

pub fn cmd_init(path: PathBuf, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::usage(format!("{} already exists", path.display()))
            .with_hint("pass --force to overwrite"));
    }
    std::fs::write(&path, DEFAULT_CONFIG_TOML)
        .map_err(|e| CliError::write(format!("cannot write {}: {e}", path.display())))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}
